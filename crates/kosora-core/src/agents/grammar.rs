//! Deterministic grammar rules.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Category, Finding, Result, Severity, Span};

use super::error::{AgentError, AgentResult};
use super::text::{self, CharMap, Token};
use super::{AgentAdapter, AgentContext};

pub const AGENT_ID: &str = "grammar-rules";

const THIRD_PERSON: [&str; 3] = ["he", "she", "it"];

/// A bare verb after `<auxiliary> he/she/it` is correct ("Does she go").
const AUXILIARIES: [&str; 11] = [
    "do", "does", "did", "can", "could", "will", "would", "should", "may", "might", "must",
];

/// A bare verb after `<causative> it` is correct ("Let it be").
const CAUSATIVES: [&str; 6] = ["let", "make", "have", "help", "see", "watch"];

/// Bare verb to third-person singular.
const BARE_VERBS: [(&str, &str); 20] = [
    ("be", "is"),
    ("come", "comes"),
    ("do", "does"),
    ("eat", "eats"),
    ("get", "gets"),
    ("give", "gives"),
    ("go", "goes"),
    ("have", "has"),
    ("know", "knows"),
    ("like", "likes"),
    ("live", "lives"),
    ("make", "makes"),
    ("need", "needs"),
    ("play", "plays"),
    ("say", "says"),
    ("see", "sees"),
    ("take", "takes"),
    ("think", "thinks"),
    ("want", "wants"),
    ("work", "works"),
];

fn third_person_form(verb: &str) -> Option<&'static str> {
    BARE_VERBS
        .iter()
        .find(|(bare, _)| *bare == verb)
        .map(|(_, conjugated)| *conjugated)
}

/// Rule-based grammar agent: repeated words, third-person agreement,
/// sentence capitalization and the standalone pronoun `i`.
#[derive(Debug, Clone, Default)]
pub struct GrammarRulesAgent;

impl GrammarRulesAgent {
    pub fn new() -> Self {
        Self
    }

    fn check(&self, text: &str) -> Result<Vec<Finding>> {
        let map = CharMap::new(text);
        let len = map.char_len();
        let words = text::words(text, &map);
        let mut findings = Vec::new();

        for idx in 1..words.len() {
            let (prev, word) = (&words[idx - 1], &words[idx]);
            let lower = word.text.to_lowercase();

            if prev.text.to_lowercase() == lower && only_space_between(text, &map, prev, word) {
                findings.push(
                    finding(
                        Span::new(prev.start, word.end, len)?,
                        format!("Repeated word \"{}\"", word.text),
                        Severity::Warning,
                        0.7,
                    )?
                    .with_suggestion(prev.text),
                );
                continue;
            }

            let pronoun = prev.text.to_lowercase();
            if THIRD_PERSON.contains(&pronoun.as_str()) {
                let before = idx
                    .checked_sub(2)
                    .map(|i| words[i].text.to_lowercase());
                if bare_verb_allowed(&pronoun, before.as_deref()) {
                    continue;
                }
                if let Some(conjugated) = third_person_form(&lower) {
                    findings.push(
                        finding(
                            Span::new(word.start, word.end, len)?,
                            format!(
                                "Subject-verb agreement: \"{}\" needs \"{}\"",
                                prev.text, conjugated
                            ),
                            Severity::Error,
                            0.9,
                        )?
                        .with_suggestion(conjugated),
                    );
                }
            }
        }

        for word in words
            .iter()
            .filter(|w| w.text == "i" && !starts_abbreviation(text, w))
        {
            findings.push(
                finding(
                    Span::new(word.start, word.end, len)?,
                    "The pronoun \"I\" is always capitalized",
                    Severity::Error,
                    0.9,
                )?
                .with_suggestion("I"),
            );
        }

        for sentence in text::sentences(text, &map) {
            let Some(first) = words
                .iter()
                .find(|w| w.start >= sentence.start && w.end <= sentence.end)
            else {
                continue;
            };
            // Covered by the pronoun rule.
            if first.text == "i" || joined_to_previous(text, &sentence) {
                continue;
            }
            if first.text.chars().next().is_some_and(char::is_lowercase) {
                findings.push(
                    finding(
                        Span::new(first.start, first.end, len)?,
                        "Sentence should start with a capital letter",
                        Severity::Warning,
                        0.6,
                    )?
                    .with_suggestion(capitalize(first.text)),
                );
            }
        }

        Ok(findings)
    }
}

fn bare_verb_allowed(pronoun: &str, before: Option<&str>) -> bool {
    match before {
        Some(word) if AUXILIARIES.contains(&word) => true,
        Some(word) => pronoun == "it" && CAUSATIVES.contains(&word),
        None => false,
    }
}

/// `i` followed by `.` and a letter, as in "i.e.".
fn starts_abbreviation(text: &str, word: &Token<'_>) -> bool {
    let mut rest = text.chars().skip(word.end);
    rest.next() == Some('.') && rest.next().is_some_and(char::is_alphabetic)
}

/// A stop not followed by whitespace ("i.e.", "U.S.") does not open a sentence.
fn joined_to_previous(text: &str, sentence: &Token<'_>) -> bool {
    sentence.start > 0
        && text
            .chars()
            .nth(sentence.start - 1)
            .is_some_and(|c| !c.is_whitespace())
}

fn only_space_between(text: &str, map: &CharMap, a: &Token<'_>, b: &Token<'_>) -> bool {
    let gap = Span::new(a.end, b.start, map.char_len())
        .map(|span| span.slice(text))
        .unwrap_or("");
    gap.chars().all(char::is_whitespace)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
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
        Category::Grammar,
        message,
        severity,
        confidence,
        AGENT_ID,
    )
}

#[async_trait]
impl AgentAdapter for GrammarRulesAgent {
    fn id(&self) -> &str {
        AGENT_ID
    }

    fn category(&self) -> Category {
        Category::Grammar
    }

    async fn evaluate(&self, text: &str, _context: &AgentContext) -> AgentResult<Vec<Finding>> {
        let findings = self
            .check(text)
            .map_err(|e| AgentError::malformed(AGENT_ID, e.to_string()))?;
        debug!(agent_id = AGENT_ID, findings = findings.len(), "grammar rules applied");
        Ok(findings)
    }
}
