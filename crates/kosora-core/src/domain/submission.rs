//! Submitted text and its identity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    /// Generate a random id.
    pub fn new() -> Self {
        SubmissionId(Uuid::new_v4().to_string())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(s: &str) -> Self {
        SubmissionId(s.to_string())
    }
}

/// A student text awaiting correction.
///
/// Immutable once built. The text is held behind an `Arc` so each concurrent
/// agent call can own a handle without copying it.
#[derive(Debug, Clone)]
pub struct Submission {
    id: SubmissionId,
    text: Arc<str>,
    char_len: usize,
    locale: Option<String>,
    topic: Option<String>,
}

impl Submission {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(SubmissionId::new(), text)
    }

    pub fn with_id(id: SubmissionId, text: impl Into<String>) -> Self {
        let text: String = text.into();
        let char_len = text.chars().count();
        Self {
            id,
            text: Arc::from(text),
            char_len,
            locale: None,
            topic: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Declare the subject of the text; used as the retrieval query.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn id(&self) -> &SubmissionId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Length in Unicode code points; the unit of every span offset.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// The query used to ground this submission: its topic when declared,
    /// otherwise the full text.
    pub fn retrieval_query(&self) -> &str {
        match self.topic.as_deref() {
            Some(topic) if !topic.trim().is_empty() => topic,
            _ => &self.text,
        }
    }
}
