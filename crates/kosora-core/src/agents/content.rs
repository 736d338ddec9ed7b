//! Grounding check of a submission against retrieved reference passages.

use std::collections::HashSet;

use async_trait::async_trait;
use kosora_rag::ranking;
use tracing::debug;

use crate::domain::{Category, Finding, Result, Severity, Span};

use super::error::{AgentError, AgentResult};
use super::text::{self, CharMap};
use super::{AgentAdapter, AgentContext};

pub const AGENT_ID: &str = "content-grounding";

/// Sentences with fewer content terms are too short to judge.
const MIN_SENTENCE_TERMS: usize = 2;

/// Flags sentences that share no content term with any reference passage.
///
/// Without passages there is nothing to compare against and the agent
/// reports no findings.
#[derive(Debug, Clone, Default)]
pub struct ContentGroundingAgent;

impl ContentGroundingAgent {
    pub fn new() -> Self {
        Self
    }

    fn check(&self, text: &str, context: &AgentContext) -> Result<Vec<Finding>> {
        if !context.is_grounded() {
            return Ok(Vec::new());
        }
        let reference: HashSet<String> = context
            .passages
            .iter()
            .flat_map(|p| ranking::terms(&p.text).collect::<Vec<_>>())
            .collect();

        let map = CharMap::new(text);
        let len = map.char_len();
        let mut findings = Vec::new();
        for sentence in text::sentences(text, &map) {
            let sentence_terms: Vec<String> = ranking::terms(sentence.text).collect();
            if sentence_terms.len() < MIN_SENTENCE_TERMS {
                continue;
            }
            if sentence_terms.iter().any(|t| reference.contains(t)) {
                continue;
            }
            findings.push(Finding::new(
                Span::new(sentence.start, sentence.end, len)?,
                Category::Content,
                "Not supported by the reference material",
                Severity::Warning,
                0.5,
                AGENT_ID,
            )?);
        }
        Ok(findings)
    }
}

#[async_trait]
impl AgentAdapter for ContentGroundingAgent {
    fn id(&self) -> &str {
        AGENT_ID
    }

    fn category(&self) -> Category {
        Category::Content
    }

    async fn evaluate(&self, text: &str, context: &AgentContext) -> AgentResult<Vec<Finding>> {
        let findings = self
            .check(text, context)
            .map_err(|e| AgentError::malformed(AGENT_ID, e.to_string()))?;
        debug!(
            agent_id = AGENT_ID,
            passages = context.passages.len(),
            findings = findings.len(),
            "grounding check applied"
        );
        Ok(findings)
    }
}
