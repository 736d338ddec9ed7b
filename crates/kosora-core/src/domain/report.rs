//! The correction report returned for one evaluation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::finding::Severity;
use super::issue::ReconciledIssue;
use super::submission::SubmissionId;

/// Highest possible `overall_score`, reached by a report with no issues.
pub const MAX_SCORE: f64 = 100.0;

/// Coarse classification of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Acceptable,
    NeedsRevision,
}

impl ScoreBand {
    /// Band for a score on the `[0, MAX_SCORE]` scale.
    pub fn from_score(score: f64) -> Self {
        let percentage = score / MAX_SCORE * 100.0;
        if percentage >= 85.0 {
            Self::Excellent
        } else if percentage >= 70.0 {
            Self::Good
        } else if percentage >= 50.0 {
            Self::Acceptable
        } else {
            Self::NeedsRevision
        }
    }

    /// One-sentence summary for the student.
    pub fn feedback(&self, score: f64) -> String {
        let lead = match self {
            Self::Excellent => "Excellent work.",
            Self::Good => "Good work.",
            Self::Acceptable => "Acceptable result; review the flagged passages.",
            Self::NeedsRevision => "Revisions are needed; start with the errors.",
        };
        format!("{lead} Score: {score:.1}/{MAX_SCORE:.0}")
    }
}

/// Which passages grounded the evaluation, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalSummary {
    pub used: bool,
    pub passage_ids: Vec<String>,
}

impl RetrievalSummary {
    pub fn from_passage_ids(passage_ids: Vec<String>) -> Self {
        Self {
            used: !passage_ids.is_empty(),
            passage_ids,
        }
    }
}

/// Flat, transport-ready form of one issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    pub start_offset: usize,
    pub end_offset: usize,
    pub category: String,
    pub message: String,
    pub severity: String,
    pub confidence: f64,
    pub suggestion: Option<String>,
}

impl From<&ReconciledIssue> for IssueRecord {
    fn from(issue: &ReconciledIssue) -> Self {
        Self {
            start_offset: issue.span().start(),
            end_offset: issue.span().end(),
            category: issue.category().to_string(),
            message: issue.message().to_string(),
            severity: issue.severity().to_string(),
            confidence: issue.confidence(),
            suggestion: issue.suggestion().map(str::to_string),
        }
    }
}

/// Result of one evaluation call.
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionReport {
    pub submission_id: SubmissionId,
    /// Ordered by span start, then span end, then category name.
    pub issues: Vec<ReconciledIssue>,
    pub overall_score: f64,
    pub band: ScoreBand,
    pub feedback: String,
    /// Agents that failed or timed out during this evaluation.
    pub partial_failures: BTreeSet<String>,
    pub retrieval: RetrievalSummary,
    pub generated_at: DateTime<Utc>,
}

impl CorrectionReport {
    /// `true` when no issues survived reconciliation.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity() == severity)
            .count()
    }

    pub fn to_records(&self) -> Vec<IssueRecord> {
        self.issues.iter().map(IssueRecord::from).collect()
    }

    pub fn retrieval_used(&self) -> bool {
        self.retrieval.used
    }
}
