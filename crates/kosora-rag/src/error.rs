//! Error types for retrieval.

/// Errors produced by the retrieval layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RagError {
    #[error("retrieval query must not be empty")]
    EmptyQuery,

    #[error("k must be a positive integer, got {0}")]
    InvalidK(usize),

    #[error("unknown corpus scope: {0}")]
    UnknownScope(String),

    #[error("document text must not be empty (scope {scope})")]
    EmptyDocument { scope: String },

    #[error("retrieval backend error: {0}")]
    Backend(String),
}

/// Result type for retrieval operations.
pub type RagResult<T> = std::result::Result<T, RagError>;
