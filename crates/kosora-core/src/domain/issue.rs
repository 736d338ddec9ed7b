//! Reconciled issues: findings merged into one reportable unit.

use std::collections::BTreeSet;

use serde::Serialize;

use super::finding::{Category, Severity};
use super::span::Span;

/// One or more findings of a single category collapsed into one issue.
///
/// Only the span reconciler builds these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledIssue {
    span: Span,
    category: Category,
    message: String,
    severity: Severity,
    confidence: f64,
    suggestion: Option<String>,
    contributing_agents: BTreeSet<String>,
}

impl ReconciledIssue {
    pub(crate) fn new(
        span: Span,
        category: Category,
        message: String,
        severity: Severity,
        confidence: f64,
        suggestion: Option<String>,
        contributing_agents: BTreeSet<String>,
    ) -> Self {
        Self {
            span,
            category,
            message,
            severity,
            confidence,
            suggestion,
            contributing_agents,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn contributing_agents(&self) -> &BTreeSet<String> {
        &self.contributing_agents
    }
}
