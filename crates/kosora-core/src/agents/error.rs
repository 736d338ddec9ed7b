//! Error types for agent adapters.

use serde::Serialize;

/// Why an agent call produced no usable findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentErrorKind {
    /// The call did not finish within its deadline.
    Timeout,
    /// The call could not reach the agent or the agent reported a failure.
    Transport,
    /// The agent answered, but the answer could not be parsed into findings.
    MalformedOutput,
}

impl std::fmt::Display for AgentErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Transport => write!(f, "transport"),
            Self::MalformedOutput => write!(f, "malformed_output"),
        }
    }
}

/// A failed agent call, local to one adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("agent {agent_id} failed ({kind}): {detail}")]
pub struct AgentError {
    pub kind: AgentErrorKind,
    pub agent_id: String,
    pub detail: String,
}

impl AgentError {
    pub fn new(
        kind: AgentErrorKind,
        agent_id: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            agent_id: agent_id.into(),
            detail: detail.into(),
        }
    }

    pub fn timeout(agent_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Timeout, agent_id, detail)
    }

    pub fn transport(agent_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::Transport, agent_id, detail)
    }

    pub fn malformed(agent_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AgentErrorKind::MalformedOutput, agent_id, detail)
    }

    /// Only transport failures are worth an immediate second attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind == AgentErrorKind::Transport
    }
}

/// Result type for agent calls.
pub type AgentResult<T> = std::result::Result<T, AgentError>;
