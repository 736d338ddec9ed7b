//! Normalized-query cache for retrieval results.
//!
//! Keys are SHA-256 digests of `(generation, scope, normalized query, k)`.
//! The generation is the corpus version the result was computed against, so
//! a result computed concurrently with a corpus mutation can never be served
//! for the mutated corpus.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use sha2::{Digest, Sha256};

use crate::passage::RetrievalPassage;

/// Bounded, TTL-limited cache of ranked passage lists.
pub struct QueryCache {
    cache: Cache<String, Arc<Vec<RetrievalPassage>>>,
}

impl QueryCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Cache key for a query against a given corpus generation.
    pub fn key(generation: u64, scope: Option<&str>, query: &str, k: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(generation.to_le_bytes());
        match scope {
            Some(scope) => {
                hasher.update([1u8]);
                hasher.update((scope.len() as u64).to_le_bytes());
                hasher.update(scope.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(normalize_query(query).as_bytes());
        hasher.update(b"\0");
        hasher.update((k as u64).to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<RetrievalPassage>>> {
        self.cache.get(key)
    }

    pub fn insert(&self, key: String, passages: Arc<Vec<RetrievalPassage>>) {
        self.cache.insert(key, passages);
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages() -> Arc<Vec<RetrievalPassage>> {
        Arc::new(vec![RetrievalPassage {
            passage_id: "bio_rubric_0".into(),
            text: "Osmosis is the diffusion of water.".into(),
            relevance_score: 0.7,
        }])
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  What IS   osmosis?! "), "what is osmosis");
    }

    #[test]
    fn test_equivalent_queries_share_a_key() {
        let a = QueryCache::key(1, None, "What is osmosis?", 3);
        let b = QueryCache::key(1, None, "what is   OSMOSIS", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_depends_on_generation_scope_and_k() {
        let base = QueryCache::key(1, Some("bio"), "osmosis", 3);
        assert_ne!(base, QueryCache::key(2, Some("bio"), "osmosis", 3));
        assert_ne!(base, QueryCache::key(1, Some("chem"), "osmosis", 3));
        assert_ne!(base, QueryCache::key(1, Some("bio"), "osmosis", 4));
        assert_ne!(base, QueryCache::key(1, None, "osmosis", 3));
    }

    #[test]
    fn test_unscoped_key_differs_from_any_scope_name() {
        let unscoped = QueryCache::key(1, None, "osmosis", 3);
        assert_ne!(unscoped, QueryCache::key(1, Some("*"), "osmosis", 3));
        assert_ne!(unscoped, QueryCache::key(1, Some(""), "osmosis", 3));
    }

    #[test]
    fn test_insert_get_and_clear() {
        let cache = QueryCache::new(16, Duration::from_secs(60));
        let key = QueryCache::key(0, None, "osmosis", 1);
        cache.insert(key.clone(), passages());
        assert_eq!(cache.get(&key).unwrap().len(), 1);
        cache.clear();
        assert!(cache.get(&key).is_none());
    }
}
