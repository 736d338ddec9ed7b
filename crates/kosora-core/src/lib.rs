//! Kosora Core Library
//!
//! Correction orchestration for student submissions: concurrent evaluation
//! agents, optional grounding through retrieved reference passages, span
//! reconciliation, and a scored correction report.

pub mod agents;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod orchestration;
pub mod telemetry;

pub use agents::{
    AgentAdapter, AgentContext, AgentError, AgentErrorKind, AgentRegistry, AgentResult,
    ContentGroundingAgent, GeminiAgent, GeminiSettings, GrammarRulesAgent, StyleRulesAgent,
};

pub use config::{ConfigError, ConfigResult, EngineConfig};

pub use domain::{
    Category, CorrectionReport, DomainError, EvaluationOptions, Finding, IssueRecord,
    ReconciledIssue, RetrievalSummary, ScoreBand, Severity, Span, Submission, SubmissionId,
    MAX_SCORE,
};

pub use orchestration::{
    cancellation, dispatch_agents, noisy_or, overall_score, reconcile_findings, AgentFailure,
    CancelSignal, CancellationHandle, CorrectionEngine, DispatchError, DispatchOutcome,
    EngineError, EngineResult,
};

pub use kosora_rag::{RagError, RetrievalPassage, RetrievalProvider};

pub use metrics::METRICS;
pub use obs::{
    emit_agent_failed, emit_evaluation_finished, emit_evaluation_started, emit_retrieval_completed,
    emit_retrieval_fallback, EvaluationSpan,
};
pub use telemetry::init_tracing;

/// Kosora version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
