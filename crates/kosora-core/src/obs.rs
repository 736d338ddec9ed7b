//! Structured observability hooks for the evaluation lifecycle.
//!
//! This module provides:
//! - Submission-scoped tracing spans via `EvaluationSpan`
//! - Emission functions for lifecycle events: start, retrieval, agent failure, finish
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

use crate::agents::AgentErrorKind;

/// Submission-scoped span for one evaluation.
///
/// Async code attaches it with [`EvaluationSpan::instrument`] so the span
/// follows the future across threads; sync code may [`EvaluationSpan::enter`] it.
///
/// # Example
///
/// ```ignore
/// let span = EvaluationSpan::new("sub-12345");
/// span.instrument(async { /* events carry submission_id = "sub-12345" */ }).await;
/// ```
#[derive(Debug, Clone)]
pub struct EvaluationSpan {
    span: tracing::Span,
}

impl EvaluationSpan {
    /// Create a span tagged with the submission id.
    pub fn new(submission_id: &str) -> Self {
        Self {
            span: tracing::info_span!("kosora.evaluation", submission_id = %submission_id),
        }
    }

    /// Enter the span until the guard is dropped.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Run `fut` inside the span.
    pub fn instrument<F: Future>(&self, fut: F) -> Instrumented<F> {
        fut.instrument(self.span.clone())
    }
}

/// Emit event: evaluation started with the selected agents.
pub fn emit_evaluation_started(submission_id: &str, agents: usize, use_retrieval: bool) {
    info!(
        event = "evaluation.started",
        submission_id = %submission_id,
        agents = agents,
        use_retrieval = use_retrieval,
    );
}

/// Emit event: retrieval returned passages.
pub fn emit_retrieval_completed(submission_id: &str, passages: usize) {
    info!(event = "retrieval.completed", submission_id = %submission_id, passages = passages);
}

/// Emit event: retrieval failed; the evaluation continues ungrounded.
pub fn emit_retrieval_fallback(submission_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "retrieval.fallback", submission_id = %submission_id, error = %error);
}

/// Emit event: one agent call failed.
pub fn emit_agent_failed(agent_id: &str, kind: AgentErrorKind, detail: &str) {
    warn!(event = "agent.failed", agent_id = %agent_id, kind = %kind, detail = %detail);
}

/// Emit event: evaluation finished.
pub fn emit_evaluation_finished(
    submission_id: &str,
    duration_ms: u64,
    issues: usize,
    partial_failures: usize,
    overall_score: f64,
) {
    info!(
        event = "evaluation.finished",
        submission_id = %submission_id,
        duration_ms = duration_ms,
        issues = issues,
        partial_failures = partial_failures,
        overall_score = overall_score,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_span_create() {
        let span = EvaluationSpan::new("test-submission");
        let _guard = span.enter();
        emit_evaluation_started("test-submission", 2, true);
        emit_agent_failed("grammar-rules", AgentErrorKind::Timeout, "elapsed");
    }
}
