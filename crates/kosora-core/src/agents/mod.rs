//! Evaluation agents.
//!
//! Every capability that inspects a submission sits behind [`AgentAdapter`].
//! Adapters are stateless across calls, report "no issues" as an empty list,
//! and convert whatever their backend returns into canonical [`Finding`]s at
//! the adapter boundary (see [`parse`]).
//!
//! # Module layout
//!
//! - [`error`]: `AgentError`, `AgentErrorKind`, `AgentResult`
//! - [`registry`]: `AgentRegistry`, category to adapters
//! - [`parse`]: strict conversion of loose agent output into findings
//! - [`text`]: code-point tokenization shared by the rule agents
//! - [`grammar`], [`style`], [`content`]: deterministic reference agents
//! - [`gemini`]: LLM-backed agent over the Generative Language REST API

pub mod content;
pub mod error;
pub mod gemini;
pub mod grammar;
pub mod parse;
pub mod registry;
pub mod style;
pub mod text;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kosora_rag::RetrievalPassage;

use crate::domain::{Category, Finding};

pub use content::ContentGroundingAgent;
pub use error::{AgentError, AgentErrorKind, AgentResult};
pub use gemini::{GeminiAgent, GeminiSettings};
pub use grammar::GrammarRulesAgent;
pub use registry::AgentRegistry;
pub use style::StyleRulesAgent;

/// Read-only context handed to every agent in one evaluation.
///
/// All agents of one evaluation receive the same passages.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub passages: Arc<[RetrievalPassage]>,
    pub timeout: Duration,
    pub locale: Option<String>,
}

impl AgentContext {
    pub fn new(passages: Vec<RetrievalPassage>, timeout: Duration) -> Self {
        Self {
            passages: passages.into(),
            timeout,
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    pub fn is_grounded(&self) -> bool {
        !self.passages.is_empty()
    }
}

/// A single evaluation capability.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn id(&self) -> &str;

    /// The category this agent is registered under.
    fn category(&self) -> Category;

    /// Inspect `text` and report findings.
    ///
    /// Every returned span must lie within `text`; an adapter that cannot
    /// guarantee this fails with [`AgentErrorKind::MalformedOutput`].
    async fn evaluate(&self, text: &str, context: &AgentContext) -> AgentResult<Vec<Finding>>;
}
