//! Domain models for Kosora.
//!
//! Canonical definitions for the core entities:
//! - `Submission`: Immutable student text awaiting correction
//! - `Span`: Half-open code-point range into a submission
//! - `Finding`: One issue reported by one agent
//! - `ReconciledIssue`: Findings merged into one reportable issue
//! - `CorrectionReport`: The result of one evaluation

pub mod error;
pub mod finding;
pub mod issue;
pub mod options;
pub mod report;
pub mod span;
pub mod submission;

// Re-export main types and errors
pub use error::{DomainError, Result};
pub use finding::{check_confidence, Category, Finding, Severity};
pub use issue::ReconciledIssue;
pub use options::EvaluationOptions;
pub use report::{CorrectionReport, IssueRecord, RetrievalSummary, ScoreBand, MAX_SCORE};
pub use span::Span;
pub use submission::{Submission, SubmissionId};
