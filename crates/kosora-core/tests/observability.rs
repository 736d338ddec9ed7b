//! Structured tracing events for the evaluation lifecycle.

use std::sync::Arc;

use kosora_core::{
    emit_agent_failed, emit_evaluation_finished, emit_evaluation_started,
    emit_retrieval_completed, emit_retrieval_fallback, AgentErrorKind, AgentRegistry,
    CorrectionEngine, EvaluationOptions, EvaluationSpan, GrammarRulesAgent, RagError, Submission,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn emit_evaluation_started_logs_agent_count() {
    emit_evaluation_started("sub-123", 3, true);
    assert!(logs_contain("evaluation.started"));
    assert!(logs_contain("sub-123"));
}

#[traced_test]
#[test]
fn emit_agent_failed_logs_kind() {
    emit_agent_failed(
        "gemini-grammar",
        AgentErrorKind::Timeout,
        "no answer within 10000 ms",
    );
    assert!(logs_contain("agent.failed"));
    assert!(logs_contain("timeout"));
}

#[traced_test]
#[test]
fn emit_retrieval_events() {
    emit_retrieval_completed("sub-1", 4);
    emit_retrieval_fallback("sub-2", &RagError::Backend("index offline".to_string()));
    assert!(logs_contain("retrieval.completed"));
    assert!(logs_contain("retrieval.fallback"));
    assert!(logs_contain("index offline"));
}

#[traced_test]
#[test]
fn evaluation_span_tags_events() {
    let span = EvaluationSpan::new("sub-span");
    let _guard = span.enter();
    emit_evaluation_finished("sub-span", 12, 1, 0, 72.5);
    assert!(logs_contain("kosora.evaluation"));
    assert!(logs_contain("evaluation.finished"));
}

#[traced_test]
#[tokio::test]
async fn engine_emits_lifecycle_events() {
    let mut registry = AgentRegistry::new();
    registry
        .register(Arc::new(GrammarRulesAgent::new()))
        .unwrap();
    let submission = Submission::new("She go to school yesterday.");
    CorrectionEngine::new(registry, None)
        .evaluate(&submission, &EvaluationOptions::default())
        .await
        .unwrap();

    assert!(logs_contain("evaluation.started"));
    assert!(logs_contain("evaluation.finished"));
    assert!(logs_contain(&submission.id().0));
}
