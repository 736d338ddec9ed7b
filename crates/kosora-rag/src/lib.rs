//! Kosora RAG: reference passage retrieval for grounded correction.
//!
//! This crate owns the reference corpus (exam questions, rubrics, solutions)
//! and answers ranked passage queries for the correction engine. It supplies
//! context only; it never produces corrections itself.
//!
//! ## Module layout
//!
//! - [`passage`]: `RetrievalPassage`, `PassageDocument`, `DocumentKind`
//! - [`ranking`]: term extraction and cosine relevance
//! - [`cache`]: normalized-query cache backed by moka
//! - [`store`]: `PassageStore`, the in-memory scoped corpus
//! - [`error`]: `RagError`, `RagResult`

pub mod cache;
pub mod error;
pub mod passage;
pub mod ranking;
pub mod store;

use async_trait::async_trait;

pub use cache::{normalize_query, QueryCache};
pub use error::{RagError, RagResult};
pub use passage::{DocumentKind, NewDocument, PassageDocument, RetrievalPassage};
pub use store::{CorpusStats, PassageStore, ScopeStructure, ScopedRetriever, StoreConfig};

/// A source of ranked reference passages.
///
/// Implementations must return at most `k` passages ordered by descending
/// `relevance_score`. An empty result is a valid answer: it means nothing
/// cleared the relevance floor.
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Retrieve up to `k` passages relevant to `query`.
    ///
    /// Fails with [`RagError::EmptyQuery`] for a blank query and
    /// [`RagError::InvalidK`] when `k == 0`.
    async fn retrieve(&self, query: &str, k: usize) -> RagResult<Vec<RetrievalPassage>>;
}

/// Validate the common `retrieve` arguments.
pub(crate) fn check_request(query: &str, k: usize) -> RagResult<()> {
    if k == 0 {
        return Err(RagError::InvalidK(k));
    }
    if query.trim().is_empty() {
        return Err(RagError::EmptyQuery);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_request_rejects_zero_k() {
        assert!(matches!(
            check_request("photosynthesis", 0),
            Err(RagError::InvalidK(0))
        ));
    }

    #[test]
    fn test_check_request_rejects_blank_query() {
        assert!(matches!(
            check_request("   \n", 3),
            Err(RagError::EmptyQuery)
        ));
    }

    #[test]
    fn test_check_request_accepts_valid_input() {
        assert!(check_request("cell membrane", 1).is_ok());
    }
}
