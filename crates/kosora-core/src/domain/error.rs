//! Domain-level error taxonomy for Kosora.

/// Errors produced when constructing domain values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid span [{start}, {end}) for text of length {len}")]
    InvalidSpan { start: usize, end: usize, len: usize },

    #[error("confidence must be a finite value in [0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error("finding message must not be empty")]
    EmptyMessage,

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),
}

/// Result type for domain construction.
pub type Result<T> = std::result::Result<T, DomainError>;
