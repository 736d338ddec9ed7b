//! Error types for correction orchestration.

/// Errors produced by [`CorrectionEngine`](super::CorrectionEngine).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Every selected agent failed; no report can be produced.
    #[error("evaluation unavailable: all agents failed ({})", agents.join(", "))]
    AllAgentsFailed { agents: Vec<String> },

    #[error("no agent is registered for the enabled categories")]
    NoAgentsSelected,

    #[error("invalid evaluation options: {0}")]
    InvalidOptions(String),

    #[error("evaluation cancelled")]
    Cancelled,
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors produced by the dispatch coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch cancelled")]
    Cancelled,
}

impl From<DispatchError> for EngineError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Cancelled => EngineError::Cancelled,
        }
    }
}
