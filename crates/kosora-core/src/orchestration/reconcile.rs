//! Span reconciliation.
//!
//! Findings from independent agents often point at the same words. The
//! reconciler clusters findings whose spans overlap (transitively) and emits
//! one issue per category present in each cluster. Output is a pure function
//! of the finding multiset, independent of the order agents answered in.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Category, Finding, ReconciledIssue, Span};

/// `1 - Π(1 - c_i)`: the chance that at least one independent report is right.
pub fn noisy_or(confidences: impl IntoIterator<Item = f64>) -> f64 {
    let miss: f64 = confidences
        .into_iter()
        .map(|c| 1.0 - c.clamp(0.0, 1.0))
        .product();
    (1.0 - miss).clamp(0.0, 1.0)
}

/// Merge findings into issues and drop those below `min_confidence`.
///
/// Issues are ordered by span start, then span end, then category name.
pub fn reconcile_findings(findings: &[Finding], min_confidence: f64) -> Vec<ReconciledIssue> {
    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| {
        (a.span(), a.category(), a.source_agent(), a.message()).cmp(&(
            b.span(),
            b.category(),
            b.source_agent(),
            b.message(),
        ))
    });

    let mut issues = Vec::new();
    for (span, members) in clusters(&sorted) {
        let mut by_category: BTreeMap<Category, Vec<&Finding>> = BTreeMap::new();
        for finding in members {
            by_category
                .entry(finding.category())
                .or_default()
                .push(finding);
        }
        for (category, group) in by_category {
            let issue = merge_group(span, category, &group);
            if issue.confidence() >= min_confidence {
                issues.push(issue);
            }
        }
    }

    issues.sort_by(|a, b| (a.span(), a.category()).cmp(&(b.span(), b.category())));
    issues
}

/// Interval-union sweep over findings sorted by span. Touching spans start a
/// new cluster.
fn clusters<'a>(sorted: &[&'a Finding]) -> Vec<(Span, Vec<&'a Finding>)> {
    let mut out: Vec<(Span, Vec<&'a Finding>)> = Vec::new();
    for &finding in sorted {
        match out.last_mut() {
            Some((union, members)) if union.overlaps(&finding.span()) => {
                *union = union.union(&finding.span());
                members.push(finding);
            }
            _ => out.push((finding.span(), vec![finding])),
        }
    }
    out
}

/// Highest confidence first, then lowest agent id.
fn rank(a: &&Finding, b: &&Finding) -> Ordering {
    b.confidence()
        .total_cmp(&a.confidence())
        .then_with(|| a.source_agent().cmp(b.source_agent()))
}

fn merge_group(span: Span, category: Category, group: &[&Finding]) -> ReconciledIssue {
    let mut ranked = group.to_vec();
    ranked.sort_by(rank);

    let lead = ranked[0];
    let severity = group
        .iter()
        .map(|f| f.severity())
        .max()
        .unwrap_or(lead.severity());
    let suggestion = ranked
        .iter()
        .find_map(|f| f.suggested_replacement())
        .map(str::to_string);
    let agents: BTreeSet<String> = group.iter().map(|f| f.source_agent().to_string()).collect();

    ReconciledIssue::new(
        span,
        category,
        lead.message().to_string(),
        severity,
        noisy_or(group.iter().map(|f| f.confidence())),
        suggestion,
        agents,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    const LEN: usize = 100;

    fn finding(
        start: usize,
        end: usize,
        category: Category,
        confidence: f64,
        agent: &str,
    ) -> Finding {
        Finding::new(
            Span::new(start, end, LEN).unwrap(),
            category,
            format!("{category} issue from {agent}"),
            Severity::Warning,
            confidence,
            agent,
        )
        .unwrap()
    }

    #[test]
    fn test_noisy_or_examples() {
        assert!((noisy_or([0.6, 0.5]) - 0.8).abs() < 1e-9);
        assert_eq!(noisy_or([]), 0.0);
        assert_eq!(noisy_or([1.0, 0.3]), 1.0);
    }

    #[test]
    fn test_noisy_or_is_monotonic() {
        let mut confidences = Vec::new();
        let mut prev = noisy_or(confidences.clone());
        for c in [0.1, 0.0, 0.35, 0.9, 0.5] {
            confidences.push(c);
            let next = noisy_or(confidences.clone());
            assert!(next >= prev);
            assert!((0.0..=1.0).contains(&next));
            prev = next;
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(reconcile_findings(&[], 0.2).is_empty());
    }

    #[test]
    fn test_single_finding_passes_through() {
        let f = finding(4, 6, Category::Grammar, 0.9, "a").with_suggestion("goes");
        let issues = reconcile_findings(std::slice::from_ref(&f), 0.2);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.span(), f.span());
        assert_eq!(issue.message(), f.message());
        assert_eq!(issue.severity(), f.severity());
        assert_eq!(issue.confidence(), 0.9);
        assert_eq!(issue.suggestion(), Some("goes"));
    }

    #[test]
    fn test_touching_spans_stay_separate() {
        let issues = reconcile_findings(
            &[
                finding(0, 4, Category::Style, 0.5, "a"),
                finding(4, 8, Category::Style, 0.5, "b"),
            ],
            0.2,
        );
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_transitive_overlap_forms_one_cluster() {
        let issues = reconcile_findings(
            &[
                finding(0, 5, Category::Grammar, 0.3, "a"),
                finding(4, 9, Category::Grammar, 0.3, "b"),
                finding(8, 12, Category::Grammar, 0.3, "c"),
            ],
            0.2,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!((issues[0].span().start(), issues[0].span().end()), (0, 12));
        assert_eq!(issues[0].contributing_agents().len(), 3);
    }

    #[test]
    fn test_mixed_categories_share_cluster_span() {
        let issues = reconcile_findings(
            &[
                finding(2, 6, Category::Style, 0.5, "style"),
                finding(4, 10, Category::Grammar, 0.7, "grammar"),
            ],
            0.2,
        );
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].category(), Category::Grammar);
        assert_eq!(issues[1].category(), Category::Style);
        for issue in &issues {
            assert_eq!((issue.span().start(), issue.span().end()), (2, 10));
        }
    }

    #[test]
    fn test_message_tie_goes_to_lowest_agent() {
        let issues = reconcile_findings(
            &[
                finding(0, 3, Category::Grammar, 0.6, "zeta"),
                finding(0, 3, Category::Grammar, 0.6, "alpha"),
            ],
            0.2,
        );
        assert_eq!(issues[0].message(), "grammar issue from alpha");
    }

    #[test]
    fn test_severity_is_max_and_low_confidence_dropped() {
        let err = Finding::new(
            Span::new(0, 3, LEN).unwrap(),
            Category::Grammar,
            "serious",
            Severity::Error,
            0.3,
            "b",
        )
        .unwrap();
        let issues = reconcile_findings(&[finding(1, 3, Category::Grammar, 0.6, "a"), err], 0.2);
        assert_eq!(issues[0].severity(), Severity::Error);
        assert_eq!(issues[0].message(), "grammar issue from a");

        let faint = reconcile_findings(&[finding(10, 12, Category::Other, 0.1, "a")], 0.2);
        assert!(faint.is_empty());
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let mut findings = vec![
            finding(20, 25, Category::Style, 0.4, "s"),
            finding(0, 3, Category::Grammar, 0.6, "g1"),
            finding(1, 2, Category::Grammar, 0.5, "g2"),
            finding(0, 3, Category::Content, 0.5, "c"),
        ];
        let forward = reconcile_findings(&findings, 0.2);
        findings.reverse();
        let backward = reconcile_findings(&findings, 0.2);
        assert_eq!(forward, backward);
        let starts: Vec<(usize, usize)> = forward
            .iter()
            .map(|i| (i.span().start(), i.span().end()))
            .collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }
}
