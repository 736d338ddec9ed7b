//! Overall score from reconciled issues.

use crate::domain::{ReconciledIssue, MAX_SCORE};

/// Penalty mass at which the score halves.
pub const SCORE_K: f64 = 20.0;

/// `MAX_SCORE * K / (K + W)` with `W = Σ weight(severity) * (0.5 + 0.5 * confidence)`.
///
/// Equals `MAX_SCORE` with no issues and strictly decreases with every
/// added issue, since each contributes at least half its severity weight.
pub fn overall_score(issues: &[ReconciledIssue]) -> f64 {
    let penalty: f64 = issues
        .iter()
        .map(|i| i.severity().weight() * (0.5 + 0.5 * i.confidence()))
        .sum();
    (MAX_SCORE * SCORE_K / (SCORE_K + penalty)).clamp(0.0, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Finding, Severity, Span};
    use crate::orchestration::reconcile_findings;

    fn issues(specs: &[(usize, Severity, f64)]) -> Vec<ReconciledIssue> {
        let findings: Vec<Finding> = specs
            .iter()
            .map(|&(start, severity, confidence)| {
                Finding::new(
                    Span::new(start, start + 1, 100).unwrap(),
                    Category::Grammar,
                    "m",
                    severity,
                    confidence,
                    "a",
                )
                .unwrap()
            })
            .collect();
        reconcile_findings(&findings, 0.0)
    }

    #[test]
    fn test_no_issues_is_max() {
        assert_eq!(overall_score(&[]), MAX_SCORE);
    }

    #[test]
    fn test_single_error_example() {
        // W = 8 * 0.95 = 7.6
        let score = overall_score(&issues(&[(4, Severity::Error, 0.9)]));
        assert!((score - 100.0 * 20.0 / 27.6).abs() < 1e-9);
        assert!(score < MAX_SCORE);
    }

    #[test]
    fn test_each_issue_lowers_score() {
        let mut specs = Vec::new();
        let mut prev = overall_score(&[]);
        for (i, severity) in [
            Severity::Info,
            Severity::Warning,
            Severity::Error,
            Severity::Info,
        ]
        .into_iter()
        .enumerate()
        {
            specs.push((i * 2, severity, 0.0));
            let next = overall_score(&issues(&specs));
            assert!(next < prev);
            assert!(next > 0.0);
            prev = next;
        }
    }

    #[test]
    fn test_score_stays_bounded_under_many_issues() {
        let specs: Vec<(usize, Severity, f64)> =
            (0..45).map(|i| (i * 2, Severity::Error, 1.0)).collect();
        let score = overall_score(&issues(&specs));
        assert!((0.0..=MAX_SCORE).contains(&score));
    }
}
