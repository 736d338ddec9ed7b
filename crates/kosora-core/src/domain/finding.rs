//! Findings: one issue reported by one agent.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::span::Span;

/// The kind of issue a finding describes.
///
/// Variants are declared in name order so the derived `Ord` matches the
/// lexical order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Content,
    Grammar,
    Other,
    Style,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Content,
        Category::Grammar,
        Category::Other,
        Category::Style,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grammar => "grammar",
            Self::Style => "style",
            Self::Content => "content",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grammar" => Ok(Self::Grammar),
            "style" => Ok(Self::Style),
            "content" => Ok(Self::Content),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::UnknownCategory(s.to_string())),
        }
    }
}

/// How serious an issue is. Ordered `Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Weight used by the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Info => 1.0,
            Self::Warning => 3.0,
            Self::Error => 8.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(DomainError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Check that `confidence` is a finite value in `[0, 1]`.
pub fn check_confidence(confidence: f64) -> Result<f64> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(DomainError::InvalidConfidence(confidence))
    }
}

/// One issue reported by one agent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    span: Span,
    category: Category,
    message: String,
    severity: Severity,
    confidence: f64,
    suggested_replacement: Option<String>,
    source_agent: String,
}

impl Finding {
    pub fn new(
        span: Span,
        category: Category,
        message: impl Into<String>,
        severity: Severity,
        confidence: f64,
        source_agent: impl Into<String>,
    ) -> Result<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(DomainError::EmptyMessage);
        }
        Ok(Self {
            span,
            category,
            message,
            severity,
            confidence: check_confidence(confidence)?,
            suggested_replacement: None,
            source_agent: source_agent.into(),
        })
    }

    pub fn with_suggestion(mut self, replacement: impl Into<String>) -> Self {
        self.suggested_replacement = Some(replacement.into());
        self
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

    pub fn suggested_replacement(&self) -> Option<&str> {
        self.suggested_replacement.as_deref()
    }

    pub fn source_agent(&self) -> &str {
        &self.source_agent
    }
}
