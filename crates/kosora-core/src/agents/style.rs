//! Deterministic style rules.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::domain::{Category, Finding, Result, Severity, Span};

use super::error::{AgentError, AgentResult};
use super::text::{self, CharMap};
use super::{AgentAdapter, AgentContext};

pub const AGENT_ID: &str = "style-rules";
pub const DEFAULT_SENTENCE_WORD_LIMIT: usize = 30;

const FILLERS: [&str; 9] = [
    "actually",
    "basically",
    "extremely",
    "just",
    "literally",
    "quite",
    "really",
    "totally",
    "very",
];

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("valid spaces regex"))
}

/// Rule-based style agent: overlong sentences, filler intensifiers and
/// runs of spaces.
#[derive(Debug, Clone)]
pub struct StyleRulesAgent {
    sentence_word_limit: usize,
}

impl Default for StyleRulesAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRulesAgent {
    pub fn new() -> Self {
        Self {
            sentence_word_limit: DEFAULT_SENTENCE_WORD_LIMIT,
        }
    }

    /// Sentences with more than `limit` words are flagged. Clamped to 1.
    pub fn with_sentence_word_limit(mut self, limit: usize) -> Self {
        self.sentence_word_limit = limit.max(1);
        self
    }

    pub fn sentence_word_limit(&self) -> usize {
        self.sentence_word_limit
    }

    fn check(&self, text: &str) -> Result<Vec<Finding>> {
        let map = CharMap::new(text);
        let len = map.char_len();
        let words = text::words(text, &map);
        let mut findings = Vec::new();

        for sentence in text::sentences(text, &map) {
            let count = words
                .iter()
                .filter(|w| w.start >= sentence.start && w.end <= sentence.end)
                .count();
            if count > self.sentence_word_limit {
                findings.push(finding(
                    Span::new(sentence.start, sentence.end, len)?,
                    format!(
                        "Sentence has {count} words; consider splitting it (limit {})",
                        self.sentence_word_limit
                    ),
                    Severity::Warning,
                    0.6,
                )?);
            }
        }

        for word in &words {
            let lower = word.text.to_lowercase();
            if FILLERS.contains(&lower.as_str()) {
                findings.push(finding(
                    Span::new(word.start, word.end, len)?,
                    format!("\"{}\" adds little; consider removing it", word.text),
                    Severity::Info,
                    0.5,
                )?);
            }
        }

        for run in text::tokens(spaces_re(), text, &map) {
            findings.push(
                finding(
                    Span::new(run.start, run.end, len)?,
                    "Multiple consecutive spaces",
                    Severity::Info,
                    0.8,
                )?
                .with_suggestion(" "),
            );
        }

        Ok(findings)
    }
}

fn finding(
    span: Span,
    message: impl Into<String>,
    severity: Severity,
    confidence: f64,
) -> Result<Finding> {
    Finding::new(
        span,
        Category::Style,
        message,
        severity,
        confidence,
        AGENT_ID,
    )
}

#[async_trait]
impl AgentAdapter for StyleRulesAgent {
    fn id(&self) -> &str {
        AGENT_ID
    }

    fn category(&self) -> Category {
        Category::Style
    }

    async fn evaluate(&self, text: &str, _context: &AgentContext) -> AgentResult<Vec<Finding>> {
        let findings = self
            .check(text)
            .map_err(|e| AgentError::malformed(AGENT_ID, e.to_string()))?;
        debug!(agent_id = AGENT_ID, findings = findings.len(), "style rules applied");
        Ok(findings)
    }
}
