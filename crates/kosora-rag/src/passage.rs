//! Passage and document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ranked passage handed to the correction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalPassage {
    pub passage_id: String,
    pub text: String,
    /// Cosine relevance in `[0.0, 1.0]`.
    pub relevance_score: f64,
}

/// The role a document plays within an exam scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Question,
    Rubric,
    Solution,
    Instruction,
    Reference,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Question => write!(f, "question"),
            Self::Rubric => write!(f, "rubric"),
            Self::Solution => write!(f, "solution"),
            Self::Instruction => write!(f, "instruction"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// A document as supplied by the caller, before it is indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewDocument {
    pub fn new(kind: DocumentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An indexed document inside the passage store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageDocument {
    /// `"{scope}_{kind}_{n}"`, unique within the store.
    pub id: String,
    pub scope: String,
    pub kind: DocumentKind,
    pub text: String,
    pub metadata: serde_json::Value,
    pub added_at: DateTime<Utc>,
}

impl PassageDocument {
    /// Project this document into a passage with the given relevance.
    pub fn to_passage(&self, relevance_score: f64) -> RetrievalPassage {
        RetrievalPassage {
            passage_id: self.id.clone(),
            text: self.text.clone(),
            relevance_score,
        }
    }
}
