//! Code-point tokenization for the rule agents.
//!
//! Regex matches report byte offsets; spans are in code points. [`CharMap`]
//! converts between the two.

use std::sync::OnceLock;

use regex::Regex;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").expect("valid word regex")
    })
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]+[.!?]*").expect("valid sentence regex"))
}

/// Byte offset to code-point offset lookup for one text.
#[derive(Debug, Clone)]
pub struct CharMap {
    // Byte offset of every char, followed by the text length.
    starts: Vec<usize>,
}

impl CharMap {
    pub fn new(text: &str) -> Self {
        let mut starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        starts.push(text.len());
        Self { starts }
    }

    /// Code-point offset of a byte offset that lies on a char boundary.
    pub fn char_offset(&self, byte: usize) -> usize {
        match self.starts.binary_search(&byte) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    pub fn char_len(&self) -> usize {
        self.starts.len() - 1
    }
}

/// A token with code-point offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Words: runs of letters and digits, with inner apostrophes.
pub fn words<'a>(text: &'a str, map: &CharMap) -> Vec<Token<'a>> {
    tokens(word_re(), text, map)
}

/// Sentences: text up to and including terminal punctuation, with
/// surrounding whitespace trimmed. Blank segments are skipped.
pub fn sentences<'a>(text: &'a str, map: &CharMap) -> Vec<Token<'a>> {
    sentence_re()
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str();
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            let lead = raw.len() - raw.trim_start().len();
            let begin = m.start() + lead;
            let finish = begin + trimmed.len();
            Some(Token {
                start: map.char_offset(begin),
                end: map.char_offset(finish),
                text: trimmed,
            })
        })
        .collect()
}

/// Every match of `re` as a code-point token.
pub fn tokens<'a>(re: &Regex, text: &'a str, map: &CharMap) -> Vec<Token<'a>> {
    re.find_iter(text)
        .map(|m| Token {
            start: map.char_offset(m.start()),
            end: map.char_offset(m.end()),
            text: m.as_str(),
        })
        .collect()
}
