//! In-memory passage store partitioned by exam scope.
//!
//! [`PassageStore`] holds the reference documents for every exam, ranks them
//! lexically against a query, and caches ranked results. The corpus sits
//! behind an `RwLock`; every mutation bumps the corpus generation and clears
//! the query cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::QueryCache;
use crate::error::{RagError, RagResult};
use crate::passage::{DocumentKind, NewDocument, PassageDocument, RetrievalPassage};
use crate::ranking::TermVector;
use crate::{check_request, RetrievalProvider};

/// Tuning for a [`PassageStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Passages scoring below this relevance are never returned.
    pub relevance_floor: f64,
    pub cache_capacity: u64,
    pub cache_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            relevance_floor: 0.05,
            cache_capacity: 1024,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

/// Documents of one scope grouped by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeStructure {
    pub scope: String,
    pub documents: BTreeMap<DocumentKind, Vec<PassageDocument>>,
}

impl ScopeStructure {
    pub fn of_kind(&self, kind: DocumentKind) -> &[PassageDocument] {
        self.documents.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Corpus-wide counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_documents: usize,
    pub scopes: BTreeMap<String, usize>,
    pub generation: u64,
}

struct IndexedDocument {
    document: PassageDocument,
    vector: TermVector,
}

#[derive(Default)]
struct Corpus {
    // BTreeMap keeps scoring iteration order stable.
    documents: BTreeMap<String, IndexedDocument>,
    next_seq: HashMap<(String, DocumentKind), usize>,
    generation: u64,
}

/// Scoped, cached, lexically ranked reference corpus.
pub struct PassageStore {
    config: StoreConfig,
    corpus: RwLock<Corpus>,
    cache: QueryCache,
}

impl PassageStore {
    pub fn new(config: StoreConfig) -> Self {
        let cache = QueryCache::new(config.cache_capacity, config.cache_ttl);
        Self {
            config,
            corpus: RwLock::new(Corpus::default()),
            cache,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Corpus> {
        self.corpus.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Corpus> {
        self.corpus.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add documents to `scope`. The whole batch is rejected if any document
    /// has blank text. Returns the number of documents added.
    pub fn add_documents(&self, scope: &str, documents: Vec<NewDocument>) -> RagResult<usize> {
        if documents.iter().any(|d| d.text.trim().is_empty()) {
            return Err(RagError::EmptyDocument {
                scope: scope.to_string(),
            });
        }

        let added = documents.len();
        let mut corpus = self.write();
        let now = Utc::now();
        for doc in documents {
            let seq = corpus
                .next_seq
                .entry((scope.to_string(), doc.kind))
                .or_insert(0);
            let id = format!("{scope}_{}_{}", doc.kind, *seq);
            *seq += 1;

            let vector = TermVector::from_text(&doc.text);
            let document = PassageDocument {
                id: id.clone(),
                scope: scope.to_string(),
                kind: doc.kind,
                text: doc.text,
                metadata: doc.metadata,
                added_at: now,
            };
            corpus
                .documents
                .insert(id, IndexedDocument { document, vector });
        }
        corpus.generation += 1;
        self.cache.clear();

        info!(
            scope = %scope,
            added,
            total = corpus.documents.len(),
            "documents added to corpus"
        );
        Ok(added)
    }

    /// Remove every document of `scope`. Returns how many were removed.
    pub fn delete_scope(&self, scope: &str) -> usize {
        let mut corpus = self.write();
        let before = corpus.documents.len();
        corpus.documents.retain(|_, d| d.document.scope != scope);
        corpus.next_seq.retain(|(s, _), _| s != scope);
        let removed = before - corpus.documents.len();

        if removed > 0 {
            corpus.generation += 1;
            self.cache.clear();
            info!(scope = %scope, removed, "scope deleted from corpus");
        }
        removed
    }

    /// Documents of `scope`, grouped by kind.
    pub fn structure(&self, scope: &str) -> RagResult<ScopeStructure> {
        let corpus = self.read();
        let mut documents: BTreeMap<DocumentKind, Vec<PassageDocument>> = BTreeMap::new();
        for indexed in corpus.documents.values() {
            if indexed.document.scope == scope {
                documents
                    .entry(indexed.document.kind)
                    .or_default()
                    .push(indexed.document.clone());
            }
        }
        if documents.is_empty() {
            return Err(RagError::UnknownScope(scope.to_string()));
        }
        Ok(ScopeStructure {
            scope: scope.to_string(),
            documents,
        })
    }

    pub fn stats(&self) -> CorpusStats {
        let corpus = self.read();
        let mut scopes = BTreeMap::new();
        for indexed in corpus.documents.values() {
            *scopes.entry(indexed.document.scope.clone()).or_insert(0) += 1;
        }
        CorpusStats {
            total_documents: corpus.documents.len(),
            scopes,
            generation: corpus.generation,
        }
    }

    /// Rank passages for `query`, optionally restricted to one scope.
    ///
    /// Results are ordered by descending relevance, ties broken by passage
    /// id, and truncated to `k`. Passages below the relevance floor are
    /// dropped, so the result may be empty.
    pub fn retrieve_scoped(
        &self,
        scope: Option<&str>,
        query: &str,
        k: usize,
    ) -> RagResult<Vec<RetrievalPassage>> {
        check_request(query, k)?;

        let corpus = self.read();
        if let Some(scope) = scope {
            if !corpus.documents.values().any(|d| d.document.scope == scope) {
                return Err(RagError::UnknownScope(scope.to_string()));
            }
        }

        let key = QueryCache::key(corpus.generation, scope, query, k);
        if let Some(hit) = self.cache.get(&key) {
            debug!(scope = ?scope, passages = hit.len(), "retrieval cache hit");
            return Ok(hit.as_ref().clone());
        }

        let query_vector = TermVector::from_text(query);
        let mut scored: Vec<RetrievalPassage> = corpus
            .documents
            .values()
            .filter(|d| scope.map_or(true, |s| d.document.scope == s))
            .filter_map(|d| {
                let score = query_vector.cosine(&d.vector);
                (score >= self.config.relevance_floor).then(|| d.document.to_passage(score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| a.passage_id.cmp(&b.passage_id))
        });
        scored.truncate(k);

        debug!(scope = ?scope, passages = scored.len(), "retrieval computed");
        self.cache.insert(key, Arc::new(scored.clone()));
        Ok(scored)
    }
}

impl Default for PassageStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl RetrievalProvider for PassageStore {
    async fn retrieve(&self, query: &str, k: usize) -> RagResult<Vec<RetrievalPassage>> {
        self.retrieve_scoped(None, query, k)
    }
}

/// A [`PassageStore`] view restricted to one exam scope.
#[derive(Clone)]
pub struct ScopedRetriever {
    store: Arc<PassageStore>,
    scope: String,
}

impl ScopedRetriever {
    pub fn new(store: Arc<PassageStore>, scope: impl Into<String>) -> Self {
        Self {
            store,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

#[async_trait]
impl RetrievalProvider for ScopedRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> RagResult<Vec<RetrievalPassage>> {
        self.store.retrieve_scoped(Some(&self.scope), query, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_biology() -> PassageStore {
        let store = PassageStore::default();
        store
            .add_documents(
                "bio-101",
                vec![
                    NewDocument::new(DocumentKind::Question, "Explain osmosis in plant cells."),
                    NewDocument::new(
                        DocumentKind::Solution,
                        "Osmosis is the movement of water across a semi-permeable membrane.",
                    ),
                    NewDocument::new(
                        DocumentKind::Rubric,
                        "Mention water, membrane and concentration.",
                    ),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_add_assigns_scope_kind_ids() {
        let store = store_with_biology();
        let structure = store.structure("bio-101").unwrap();
        assert_eq!(
            structure.of_kind(DocumentKind::Question)[0].id,
            "bio-101_question_0"
        );
        assert_eq!(
            structure.of_kind(DocumentKind::Solution)[0].id,
            "bio-101_solution_0"
        );
        assert!(structure.of_kind(DocumentKind::Instruction).is_empty());
    }

    #[test]
    fn test_ids_keep_counting_across_batches() {
        let store = store_with_biology();
        let extra = NewDocument::new(DocumentKind::Question, "Define diffusion.");
        store.add_documents("bio-101", vec![extra]).unwrap();
        let structure = store.structure("bio-101").unwrap();
        let ids: Vec<&str> = structure
            .of_kind(DocumentKind::Question)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["bio-101_question_0", "bio-101_question_1"]);
    }

    #[test]
    fn test_blank_document_rejects_batch() {
        let store = PassageStore::default();
        let err = store
            .add_documents(
                "bio-101",
                vec![
                    NewDocument::new(DocumentKind::Question, "Valid"),
                    NewDocument::new(DocumentKind::Rubric, "   "),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_retrieve_orders_by_relevance_and_respects_k() {
        let store = store_with_biology();
        let passages = store
            .retrieve_scoped(None, "osmosis water membrane", 2)
            .unwrap();
        assert_eq!(passages.len(), 2);
        assert!(passages[0].relevance_score >= passages[1].relevance_score);
        assert_eq!(passages[0].passage_id, "bio-101_solution_0");
    }

    #[test]
    fn test_retrieve_below_floor_is_empty_not_error() {
        let store = store_with_biology();
        let passages = store.retrieve_scoped(None, "french revolution", 3).unwrap();
        assert!(passages.is_empty());
    }

    #[test]
    fn test_unknown_scope_is_an_error() {
        let store = store_with_biology();
        let err = store
            .retrieve_scoped(Some("chem-201"), "osmosis", 3)
            .unwrap_err();
        assert!(matches!(err, RagError::UnknownScope(s) if s == "chem-201"));
    }

    #[test]
    fn test_delete_scope_invalidates_cached_results() {
        let store = store_with_biology();
        let water = NewDocument::new(DocumentKind::Reference, "Water is a polar molecule.");
        store.add_documents("chem-201", vec![water]).unwrap();

        let before = store.retrieve_scoped(None, "water", 5).unwrap();
        assert!(before.iter().any(|p| p.passage_id.starts_with("chem-201")));

        assert_eq!(store.delete_scope("chem-201"), 1);
        let after = store.retrieve_scoped(None, "water", 5).unwrap();
        assert!(after.iter().all(|p| !p.passage_id.starts_with("chem-201")));
    }

    #[test]
    fn test_stats_count_per_scope() {
        let store = store_with_biology();
        let question = NewDocument::new(DocumentKind::Question, "Balance the equation.");
        store.add_documents("chem-201", vec![question]).unwrap();
        let stats = store.stats();
        assert_eq!(stats.total_documents, 4);
        assert_eq!(stats.scopes["bio-101"], 3);
        assert_eq!(stats.scopes["chem-201"], 1);
        assert_eq!(stats.generation, 2);
    }

    #[test]
    fn test_delete_missing_scope_is_noop() {
        let store = store_with_biology();
        let generation = store.stats().generation;
        assert_eq!(store.delete_scope("nope"), 0);
        assert_eq!(store.stats().generation, generation);
    }
}
