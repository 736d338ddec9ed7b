//! Per-call evaluation options.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::finding::Category;

/// Options supplied with each `evaluate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    /// Only agents registered for these categories are dispatched.
    pub enabled_categories: BTreeSet<Category>,
    /// Ground agents with retrieved passages when a provider is configured.
    pub use_retrieval: bool,
    /// Deadline for each agent call, in milliseconds. Must be positive.
    pub per_agent_timeout_ms: u64,
    /// Issues with a merged confidence below this are dropped.
    pub min_confidence: f64,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            enabled_categories: Category::ALL.into_iter().collect(),
            use_retrieval: true,
            per_agent_timeout_ms: 10_000,
            min_confidence: 0.2,
        }
    }
}

impl EvaluationOptions {
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.enabled_categories = categories.into_iter().collect();
        self
    }

    pub fn with_retrieval(mut self, use_retrieval: bool) -> Self {
        self.use_retrieval = use_retrieval;
        self
    }

    pub fn with_timeout_ms(mut self, per_agent_timeout_ms: u64) -> Self {
        self.per_agent_timeout_ms = per_agent_timeout_ms;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn per_agent_timeout(&self) -> Duration {
        Duration::from_millis(self.per_agent_timeout_ms)
    }

    /// Check the option invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.per_agent_timeout_ms == 0 {
            return Err("per_agent_timeout_ms must be greater than zero".to_string());
        }
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            ));
        }
        if self.enabled_categories.is_empty() {
            return Err("at least one category must be enabled".to_string());
        }
        Ok(())
    }
}
