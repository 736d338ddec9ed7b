//! Lexical relevance: term extraction and cosine similarity over term counts.

use std::collections::HashMap;

/// Words too common to carry relevance. English and French, matching the
/// languages the corpus is written in.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "with", "le", "la",
    "les", "de", "des", "du", "un", "une", "et", "en", "est", "au", "aux",
];

/// Term counts for one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    counts: HashMap<String, u32>,
}

impl TermVector {
    /// Build a term vector from free text.
    pub fn from_text(text: &str) -> Self {
        let mut counts = HashMap::new();
        for term in terms(text) {
            *counts.entry(term).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.counts.contains_key(term)
    }

    fn norm(&self) -> f64 {
        self.counts
            .values()
            .map(|&c| f64::from(c) * f64::from(c))
            .sum::<f64>()
            .sqrt()
    }

    /// Cosine similarity in `[0.0, 1.0]`; zero when either side is empty.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .counts
            .iter()
            .filter_map(|(term, &a)| {
                let b = large.counts.get(term)?;
                Some(f64::from(a) * f64::from(*b))
            })
            .sum();
        (dot / (self.norm() * other.norm())).clamp(0.0, 1.0)
    }
}

/// Lowercased alphanumeric tokens with stop words removed.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}
