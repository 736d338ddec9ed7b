//! Concurrent fan-out to evaluation agents.
//!
//! Every selected agent runs on its own task in a [`JoinSet`] with its own
//! deadline. A failing agent never blocks or poisons the others: its id lands
//! in `partial_failures` and it contributes zero findings. The coordinator
//! waits for every launched call to settle unless cancelled.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::agents::{AgentAdapter, AgentContext, AgentError, AgentErrorKind, AgentResult};
use crate::domain::Finding;
use crate::metrics::METRICS;
use crate::obs;

use super::cancel::CancelSignal;
use super::error::DispatchError;

/// Why one agent contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFailure {
    pub agent_id: String,
    pub kind: AgentErrorKind,
    pub detail: String,
}

impl From<AgentError> for AgentFailure {
    fn from(err: AgentError) -> Self {
        Self {
            agent_id: err.agent_id,
            kind: err.kind,
            detail: err.detail,
        }
    }
}

/// Everything the agents produced for one submission.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Findings of every successful agent, in agent selection order.
    pub findings: Vec<Finding>,
    /// Ids of agents that failed.
    pub partial_failures: BTreeSet<String>,
    pub failures: Vec<AgentFailure>,
    /// Wall-clock time per agent, failed ones included.
    pub durations: BTreeMap<String, Duration>,
    /// Number of agents that answered successfully.
    pub succeeded: usize,
}

impl DispatchOutcome {
    /// At least one agent was launched and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.succeeded == 0 && !self.failures.is_empty()
    }
}

/// Run every agent concurrently against `text`.
///
/// Each call gets `context.timeout`; a transport failure is retried once
/// within that same deadline. Findings with spans outside `text` turn the
/// whole answer of that agent into a `MalformedOutput` failure.
///
/// On cancellation every in-flight task is aborted and awaited before
/// returning [`DispatchError::Cancelled`].
#[instrument(
    skip_all,
    fields(agents = agents.len(), timeout_ms = context.timeout.as_millis() as u64)
)]
pub async fn dispatch_agents(
    agents: Vec<Arc<dyn AgentAdapter>>,
    text: Arc<str>,
    context: AgentContext,
    mut cancel: CancelSignal,
) -> Result<DispatchOutcome, DispatchError> {
    if cancel.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }

    let char_len = text.chars().count();
    let context = Arc::new(context);
    let ids: Vec<String> = agents.iter().map(|a| a.id().to_string()).collect();

    let mut join_set = JoinSet::new();
    let mut task_index = HashMap::new();
    for (idx, agent) in agents.into_iter().enumerate() {
        let text = Arc::clone(&text);
        let context = Arc::clone(&context);
        let handle = join_set.spawn(async move {
            let started = Instant::now();
            let result = call_agent(agent.as_ref(), &text, &context, char_len).await;
            (idx, result, started.elapsed())
        });
        task_index.insert(handle.id(), idx);
    }

    let mut slots: Vec<Option<(AgentResult<Vec<Finding>>, Duration)>> = vec![None; ids.len()];
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                while join_set.join_next().await.is_some() {}
                debug!("dispatch cancelled; all agent tasks stopped");
                return Err(DispatchError::Cancelled);
            }
            joined = join_set.join_next_with_id() => {
                match joined {
                    None => break,
                    Some(Ok((_, (idx, result, elapsed)))) => slots[idx] = Some((result, elapsed)),
                    Some(Err(join_err)) => {
                        let Some(&idx) = task_index.get(&join_err.id()) else {
                            warn!(error = %join_err, "agent task failed outside the dispatch set");
                            continue;
                        };
                        let err = AgentError::transport(
                            &ids[idx],
                            format!("agent task failed: {join_err}"),
                        );
                        slots[idx] = Some((Err(err), Duration::ZERO));
                    }
                }
            }
        }
    }

    let mut outcome = DispatchOutcome::default();
    for (id, slot) in ids.into_iter().zip(slots) {
        let (result, elapsed) = slot.unwrap_or_else(|| {
            let err = AgentError::transport(&id, "agent task produced no result");
            (Err(err), Duration::ZERO)
        });
        outcome.durations.insert(id.clone(), elapsed);
        match result {
            Ok(findings) => {
                debug!(
                    agent_id = %id,
                    findings = findings.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "agent finished"
                );
                outcome.succeeded += 1;
                outcome.findings.extend(findings);
            }
            Err(err) => {
                obs::emit_agent_failed(&id, err.kind, &err.detail);
                METRICS.inc_agent_failures();
                outcome.partial_failures.insert(id);
                outcome.failures.push(err.into());
            }
        }
    }
    Ok(outcome)
}

async fn call_agent(
    agent: &dyn AgentAdapter,
    text: &str,
    context: &AgentContext,
    char_len: usize,
) -> AgentResult<Vec<Finding>> {
    let attempts = async {
        match agent.evaluate(text, context).await {
            Err(err) if err.is_retryable() => {
                warn!(agent_id = %agent.id(), error = %err, "transport failure, retrying once");
                METRICS.inc_transport_retries();
                agent.evaluate(text, context).await
            }
            other => other,
        }
    };

    let findings = match tokio::time::timeout(context.timeout, attempts).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(AgentError::timeout(
                agent.id(),
                format!("no answer within {} ms", context.timeout.as_millis()),
            ))
        }
    };

    if let Some(bad) = findings.iter().find(|f| !f.span().fits(char_len)) {
        return Err(AgentError::malformed(
            agent.id(),
            format!("span {} outside text of {char_len} code points", bad.span()),
        ));
    }
    Ok(findings)
}
