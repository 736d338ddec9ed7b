//! Half-open code-point ranges into a submission's text.

use serde::Serialize;

use super::error::{DomainError, Result};

/// `[start, end)` in code points. Always non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Build a span checked against a text of `text_len` code points.
    pub fn new(start: usize, end: usize, text_len: usize) -> Result<Self> {
        if start >= end || end > text_len {
            return Err(DomainError::InvalidSpan {
                start,
                end,
                len: text_len,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of code points covered.
    pub fn width(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span still lies inside a text of `text_len` code points.
    pub fn fits(&self, text_len: usize) -> bool {
        self.end <= text_len
    }

    /// Strict overlap; touching spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Slice the covered code points out of `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        let mut indices = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()));
        let begin = indices.nth(self.start).unwrap_or(text.len());
        let finish = indices.nth(self.width() - 1).unwrap_or(text.len());
        &text[begin..finish]
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
