//! The correction orchestration engine.

use std::sync::Arc;

use chrono::Utc;
use kosora_rag::{RetrievalPassage, RetrievalProvider};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::agents::{AgentContext, AgentRegistry};
use crate::config::{ConfigResult, EngineConfig};
use crate::domain::{CorrectionReport, EvaluationOptions, RetrievalSummary, ScoreBand, Submission};
use crate::metrics::METRICS;
use crate::obs::{self, EvaluationSpan};

use super::cancel::CancelSignal;
use super::dispatch::dispatch_agents;
use super::error::{EngineError, EngineResult};
use super::reconcile::reconcile_findings;
use super::scoring::overall_score;

pub const DEFAULT_RETRIEVAL_K: usize = 5;

/// Evaluates submissions: retrieve, dispatch, reconcile, score.
///
/// The engine holds no per-evaluation state; one instance serves any number
/// of concurrent `evaluate` calls.
#[derive(Clone)]
pub struct CorrectionEngine {
    registry: AgentRegistry,
    retriever: Option<Arc<dyn RetrievalProvider>>,
    retrieval_k: usize,
}

impl std::fmt::Debug for CorrectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionEngine")
            .field("registry", &self.registry)
            .field("retriever", &self.retriever.is_some())
            .field("retrieval_k", &self.retrieval_k)
            .finish()
    }
}

impl CorrectionEngine {
    pub fn new(registry: AgentRegistry, retriever: Option<Arc<dyn RetrievalProvider>>) -> Self {
        Self {
            registry,
            retriever,
            retrieval_k: DEFAULT_RETRIEVAL_K,
        }
    }

    /// Number of passages requested per evaluation. Clamped to 1.
    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k.max(1);
        self
    }

    /// Engine with the registry and retrieval depth described by `config`.
    pub fn from_config(
        config: &EngineConfig,
        retriever: Option<Arc<dyn RetrievalProvider>>,
    ) -> ConfigResult<Self> {
        let engine = Self::new(config.build_registry()?, retriever);
        Ok(engine.with_retrieval_k(config.retrieval_k))
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub async fn evaluate(
        &self,
        submission: &Submission,
        options: &EvaluationOptions,
    ) -> EngineResult<CorrectionReport> {
        self.evaluate_with_cancel(submission, options, CancelSignal::never())
            .await
    }

    /// Evaluate `submission`, stopping early when `cancel` fires.
    ///
    /// Fails only when the call itself is unusable: invalid options, no
    /// agent for the enabled categories, every agent failing, or
    /// cancellation. Retrieval problems degrade to an ungrounded report.
    pub async fn evaluate_with_cancel(
        &self,
        submission: &Submission,
        options: &EvaluationOptions,
        cancel: CancelSignal,
    ) -> EngineResult<CorrectionReport> {
        let span = EvaluationSpan::new(&submission.id().0);
        let result = span.instrument(self.run(submission, options, cancel)).await;
        match &result {
            Ok(_) => METRICS.inc_evaluations_completed(),
            Err(EngineError::Cancelled) => METRICS.inc_cancellations(),
            Err(_) => METRICS.inc_evaluations_failed(),
        }
        result
    }

    async fn run(
        &self,
        submission: &Submission,
        options: &EvaluationOptions,
        mut cancel: CancelSignal,
    ) -> EngineResult<CorrectionReport> {
        let started = Instant::now();
        let submission_id = submission.id().0.as_str();

        options.validate().map_err(EngineError::InvalidOptions)?;
        let agents = self.registry.select(&options.enabled_categories);
        if agents.is_empty() {
            return Err(EngineError::NoAgentsSelected);
        }
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        obs::emit_evaluation_started(submission_id, agents.len(), options.use_retrieval);

        let passages = match (&self.retriever, options.use_retrieval) {
            (Some(retriever), true) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    passages = self.retrieve(retriever.as_ref(), submission) => passages,
                }
            }
            _ => Vec::new(),
        };
        let retrieval = RetrievalSummary::from_passage_ids(
            passages.iter().map(|p| p.passage_id.clone()).collect(),
        );

        let context = AgentContext::new(passages, options.per_agent_timeout())
            .with_locale(submission.locale().map(str::to_string));
        let outcome = dispatch_agents(agents, submission.shared_text(), context, cancel).await?;

        if outcome.all_failed() {
            return Err(EngineError::AllAgentsFailed {
                agents: outcome.partial_failures.into_iter().collect(),
            });
        }

        let issues = reconcile_findings(&outcome.findings, options.min_confidence);
        let score = overall_score(&issues);
        let band = ScoreBand::from_score(score);
        debug!(
            findings = outcome.findings.len(),
            issues = issues.len(),
            "findings reconciled"
        );

        let report = CorrectionReport {
            submission_id: submission.id().clone(),
            issues,
            overall_score: score,
            band,
            feedback: band.feedback(score),
            partial_failures: outcome.partial_failures,
            retrieval,
            generated_at: Utc::now(),
        };
        obs::emit_evaluation_finished(
            submission_id,
            started.elapsed().as_millis() as u64,
            report.issues.len(),
            report.partial_failures.len(),
            report.overall_score,
        );
        Ok(report)
    }

    /// One retrieval call; any error yields no passages.
    #[instrument(skip_all, fields(k = self.retrieval_k))]
    async fn retrieve(
        &self,
        retriever: &dyn RetrievalProvider,
        submission: &Submission,
    ) -> Vec<RetrievalPassage> {
        let submission_id = submission.id().0.as_str();
        match retriever
            .retrieve(submission.retrieval_query(), self.retrieval_k)
            .await
        {
            Ok(passages) => {
                obs::emit_retrieval_completed(submission_id, passages.len());
                passages
            }
            Err(err) => {
                obs::emit_retrieval_fallback(submission_id, &err);
                METRICS.inc_retrieval_fallbacks();
                Vec::new()
            }
        }
    }
}
