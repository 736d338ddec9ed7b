//! Dispatch coordinator: isolation, deadlines, retry, and panics.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use kosora_core::{
    dispatch_agents, AgentAdapter, AgentContext, AgentError, AgentErrorKind, AgentResult,
    CancelSignal, Category, Finding, Severity, Span,
};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

#[derive(Clone)]
enum Step {
    /// Report one finding over `[start, end)`.
    Hit(usize, usize),
    Fail(AgentErrorKind),
    /// Sleep, then report nothing.
    Sleep(u64),
    /// Sleep, then fail with a transport error.
    SlowTransport(u64),
    Panic,
}

#[derive(Clone)]
struct ScriptedAgent {
    id: &'static str,
    steps: Arc<Mutex<Vec<Step>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAgent {
    fn new(id: &'static str, steps: Vec<Step>) -> Self {
        Self {
            id,
            steps: Arc::new(Mutex::new(steps)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentAdapter for ScriptedAgent {
    fn id(&self) -> &str {
        self.id
    }

    fn category(&self) -> Category {
        Category::Grammar
    }

    async fn evaluate(
        &self,
        _text: &str,
        _context: &AgentContext,
    ) -> AgentResult<Vec<Finding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut guard = self.steps.lock().await;
            if guard.is_empty() {
                Step::Fail(AgentErrorKind::Transport)
            } else {
                guard.remove(0)
            }
        };

        match step {
            Step::Hit(start, end) => {
                // Spans are checked by the dispatcher, not here.
                let span = Span::new(start, end, usize::MAX).unwrap();
                let finding = Finding::new(
                    span,
                    Category::Grammar,
                    "scripted",
                    Severity::Warning,
                    0.5,
                    self.id,
                );
                Ok(vec![finding.unwrap()])
            }
            Step::Fail(kind) => Err(AgentError::new(kind, self.id, "scripted failure")),
            Step::Sleep(ms) => {
                sleep(Duration::from_millis(ms)).await;
                Ok(Vec::new())
            }
            Step::SlowTransport(ms) => {
                sleep(Duration::from_millis(ms)).await;
                Err(AgentError::transport(self.id, "connection reset"))
            }
            Step::Panic => panic!("scripted panic"),
        }
    }
}

const TEXT: &str = "She go to school yesterday.";

fn context(timeout_ms: u64) -> AgentContext {
    AgentContext::new(Vec::new(), Duration::from_millis(timeout_ms))
}

fn agents(list: &[&ScriptedAgent]) -> Vec<Arc<dyn AgentAdapter>> {
    list.iter()
        .map(|a| Arc::new((*a).clone()) as Arc<dyn AgentAdapter>)
        .collect()
}

#[tokio::test]
async fn transport_failure_is_retried_once_and_can_recover() {
    let agent = ScriptedAgent::new(
        "flaky",
        vec![Step::Fail(AgentErrorKind::Transport), Step::Hit(4, 6)],
    );
    let outcome = dispatch_agents(
        agents(&[&agent]),
        Arc::from(TEXT),
        context(1_000),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert_eq!(agent.call_count(), 2);
    assert_eq!(outcome.findings.len(), 1);
    assert!(outcome.partial_failures.is_empty());
}

#[tokio::test]
async fn transport_failure_twice_is_a_partial_failure() {
    let agent = ScriptedAgent::new(
        "down",
        vec![
            Step::Fail(AgentErrorKind::Transport),
            Step::Fail(AgentErrorKind::Transport),
        ],
    );
    let healthy = ScriptedAgent::new("healthy", vec![Step::Hit(0, 3)]);
    let outcome = dispatch_agents(
        agents(&[&agent, &healthy]),
        Arc::from(TEXT),
        context(1_000),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert_eq!(agent.call_count(), 2);
    let failed: Vec<&String> = outcome.partial_failures.iter().collect();
    assert_eq!(failed, vec!["down"]);
    assert_eq!(outcome.failures[0].kind, AgentErrorKind::Transport);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.succeeded, 1);
}

#[tokio::test]
async fn timeout_and_malformed_are_not_retried() {
    let timed_out = ScriptedAgent::new(
        "timed-out",
        vec![Step::Fail(AgentErrorKind::Timeout), Step::Hit(0, 3)],
    );
    let malformed = ScriptedAgent::new(
        "malformed",
        vec![Step::Fail(AgentErrorKind::MalformedOutput), Step::Hit(0, 3)],
    );
    let outcome = dispatch_agents(
        agents(&[&timed_out, &malformed]),
        Arc::from(TEXT),
        context(1_000),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert_eq!(timed_out.call_count(), 1);
    assert_eq!(malformed.call_count(), 1);
    assert!(outcome.all_failed());
}

#[tokio::test(start_paused = true)]
async fn deadline_is_enforced_per_agent() {
    let slow = ScriptedAgent::new("slow", vec![Step::Sleep(60_000)]);
    let fast = ScriptedAgent::new("fast", vec![Step::Hit(4, 6)]);

    let started = Instant::now();
    let outcome = dispatch_agents(
        agents(&[&slow, &fast]),
        Arc::from(TEXT),
        context(200),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].agent_id, "slow");
    assert_eq!(outcome.failures[0].kind, AgentErrorKind::Timeout);
    assert!(outcome.durations["slow"] >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn retry_stays_inside_the_same_deadline() {
    let agent = ScriptedAgent::new(
        "slow-flaky",
        vec![Step::SlowTransport(150), Step::SlowTransport(150)],
    );
    let started = Instant::now();
    let outcome = dispatch_agents(
        agents(&[&agent]),
        Arc::from(TEXT),
        context(200),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(agent.call_count(), 2);
    assert_eq!(outcome.failures[0].kind, AgentErrorKind::Timeout);
}

#[tokio::test]
async fn panicking_agent_is_isolated_as_transport_failure() {
    let panicky = ScriptedAgent::new("panicky", vec![Step::Panic]);
    let healthy = ScriptedAgent::new("healthy", vec![Step::Hit(4, 6)]);
    let outcome = dispatch_agents(
        agents(&[&panicky, &healthy]),
        Arc::from(TEXT),
        context(1_000),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert!(outcome.partial_failures.contains("panicky"));
    let failure = outcome
        .failures
        .iter()
        .find(|f| f.agent_id == "panicky")
        .unwrap();
    assert_eq!(failure.kind, AgentErrorKind::Transport);
    assert_eq!(outcome.findings.len(), 1);
}

#[tokio::test]
async fn span_past_end_of_text_discards_the_agent_answer() {
    let overflow = ScriptedAgent::new("overflow", vec![Step::Hit(20, 40)]);
    let outcome = dispatch_agents(
        agents(&[&overflow]),
        Arc::from(TEXT),
        context(1_000),
        CancelSignal::never(),
    )
    .await
    .unwrap();

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.failures[0].kind, AgentErrorKind::MalformedOutput);
}
