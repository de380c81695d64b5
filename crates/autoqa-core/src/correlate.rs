//! Correlation of normalized test results against a checklist and test
//! manifest, producing the compliance verdict.
//!
//! Matching is two-tier: an exact manifest name match takes that entry's
//! checklist links verbatim; otherwise fuzzy token overlap links the
//! result to checklist items. The verdict is recomputed from scratch per
//! workflow-completion event, never merged with a prior one.

use std::collections::HashSet;

use crate::domain::{
    ChecklistItem, ComplianceVerdict, NormalizedTestResult, TestManifest, TestStatus,
};

/// Tokens ignored when fuzzy-matching checklist descriptions.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "for", "and", "or", "but", "to", "of", "in", "on", "at",
];

/// Minimum token overlap for a fuzzy checklist link.
const MIN_TOKEN_OVERLAP: usize = 2;

/// A test result annotated with the checklist items it was linked to.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedResult {
    /// Manifest test id when the result matched a manifest entry.
    pub test_id: Option<String>,
    pub name: String,
    pub status: TestStatus,
    pub checklist_ids: Vec<String>,
}

/// Link each result to checklist items and compute the compliance verdict.
///
/// A manifest entry with a matching name contributes its `checklist_ids`
/// verbatim; results without a manifest link (or whose entry carries no
/// ids) fall back to fuzzy matching. `required_passed` counts distinct
/// required items covered by at least one passed result. With no manifest
/// at all (workflow event arriving before PR synchronization), correlation
/// degrades gracefully to fuzzy-only.
pub fn map_results_to_checklist(
    checklist: &[ChecklistItem],
    manifest: Option<&TestManifest>,
    results: &[NormalizedTestResult],
) -> (Vec<CorrelatedResult>, ComplianceVerdict) {
    let mut correlated = Vec::with_capacity(results.len());
    let mut covered_required: HashSet<&str> = HashSet::new();

    for result in results {
        let entry = manifest.and_then(|m| m.entry_by_name(&result.name));
        let mut checklist_ids: Vec<String> = entry
            .map(|e| e.checklist_ids.clone())
            .unwrap_or_default();
        if checklist_ids.is_empty() {
            checklist_ids = fuzzy_match_checklist(&result.name, checklist);
        }

        if result.status == TestStatus::Passed {
            for item in checklist {
                if item.required && checklist_ids.iter().any(|id| id == &item.id) {
                    covered_required.insert(item.id.as_str());
                }
            }
        }

        correlated.push(CorrelatedResult {
            test_id: entry.map(|e| e.test_id.clone()),
            name: result.name.clone(),
            status: result.status,
            checklist_ids,
        });
    }

    let required_total = checklist.iter().filter(|i| i.required).count();
    let required_passed = covered_required.len();
    // Zero required items yields 0.0, not 1.0: an unmeasured checklist is
    // never reported as fully compliant. Accepted behavior, see design notes.
    let score = if required_total > 0 {
        required_passed as f64 / required_total as f64
    } else {
        0.0
    };

    let verdict = ComplianceVerdict {
        score,
        required_passed,
        required_total,
        total_tests: results.len(),
        passed_tests: results
            .iter()
            .filter(|r| r.status == TestStatus::Passed)
            .count(),
    };

    (correlated, verdict)
}

/// Link a test name to checklist items by token overlap.
///
/// The test name is tokenized by stripping a leading `test_` marker and
/// splitting on underscores; descriptions are lowercased with stopwords
/// removed and trailing punctuation stripped. An item links iff the
/// overlap count reaches [`MIN_TOKEN_OVERLAP`].
pub fn fuzzy_match_checklist(test_name: &str, checklist: &[ChecklistItem]) -> Vec<String> {
    let lowered = test_name.to_lowercase();
    let stripped = lowered.strip_prefix("test_").unwrap_or(&lowered);
    let test_words: HashSet<&str> = stripped.split('_').filter(|w| !w.is_empty()).collect();

    checklist
        .iter()
        .filter(|item| {
            let overlap = item
                .description
                .to_lowercase()
                .split_whitespace()
                .map(|w| w.trim_end_matches(['.', ',', '!', '?', ';', ':']))
                .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
                .collect::<HashSet<_>>()
                .intersection(&test_words)
                .count();
            overlap >= MIN_TOKEN_OVERLAP
        })
        .map(|item| item.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NormalizedTestResult, TestManifestEntry};

    fn manifest_with(entries: Vec<TestManifestEntry>) -> TestManifest {
        TestManifest {
            pr_number: 1,
            head_sha: "abc".to_string(),
            entries,
        }
    }

    fn entry(test_id: &str, name: &str, checklist_ids: &[&str]) -> TestManifestEntry {
        TestManifestEntry {
            test_id: test_id.to_string(),
            name: name.to_string(),
            framework: "pytest".to_string(),
            target_file: "src/auth.py".to_string(),
            checklist_ids: checklist_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn failed(name: &str) -> NormalizedTestResult {
        NormalizedTestResult {
            status: TestStatus::Failed,
            ..NormalizedTestResult::passed(name)
        }
    }

    #[test]
    fn test_manifest_link_full_compliance() {
        let checklist = vec![ChecklistItem::new("C1", "Must validate email format", true)];
        let manifest = manifest_with(vec![entry("T1", "test_validate_email_autoqa", &["C1"])]);
        let results = vec![NormalizedTestResult::passed("test_validate_email_autoqa")];

        let (correlated, verdict) =
            map_results_to_checklist(&checklist, Some(&manifest), &results);

        assert_eq!(correlated[0].test_id.as_deref(), Some("T1"));
        assert_eq!(correlated[0].checklist_ids, vec!["C1".to_string()]);
        assert_eq!(verdict.score, 1.0);
        assert_eq!(verdict.required_passed, 1);
        assert_eq!(verdict.required_total, 1);
    }

    #[test]
    fn test_fuzzy_fallback_when_no_manifest() {
        let checklist = vec![ChecklistItem::new("C1", "Must validate email format", true)];
        let results = vec![NormalizedTestResult::passed("test_validate_email_autoqa")];

        let (correlated, verdict) = map_results_to_checklist(&checklist, None, &results);

        // "validate" + "email" overlap with the description.
        assert_eq!(correlated[0].checklist_ids, vec!["C1".to_string()]);
        assert!(correlated[0].test_id.is_none());
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn test_single_token_overlap_does_not_link() {
        let checklist = vec![ChecklistItem::new("C1", "Must validate email format", true)];
        let ids = fuzzy_match_checklist("test_email_rendering", &checklist);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_failed_result_does_not_cover() {
        let checklist = vec![ChecklistItem::new("C1", "Must validate email format", true)];
        let manifest = manifest_with(vec![entry("T1", "test_validate_email_autoqa", &["C1"])]);
        let results = vec![failed("test_validate_email_autoqa")];

        let (_, verdict) = map_results_to_checklist(&checklist, Some(&manifest), &results);
        assert_eq!(verdict.required_passed, 0);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.passed_tests, 0);
        assert_eq!(verdict.total_tests, 1);
    }

    #[test]
    fn test_required_items_not_double_counted() {
        let checklist = vec![ChecklistItem::new("C1", "Must validate email format", true)];
        let manifest = manifest_with(vec![
            entry("T1", "test_validate_email_autoqa", &["C1"]),
            entry("T2", "test_validate_email_again_autoqa", &["C1"]),
        ]);
        let results = vec![
            NormalizedTestResult::passed("test_validate_email_autoqa"),
            NormalizedTestResult::passed("test_validate_email_again_autoqa"),
        ];

        let (_, verdict) = map_results_to_checklist(&checklist, Some(&manifest), &results);
        assert_eq!(verdict.required_passed, 1);
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn test_zero_required_items_scores_zero() {
        let checklist = vec![ChecklistItem::new("C1", "Should show errors nicely", false)];
        let results = vec![NormalizedTestResult::passed("test_show_errors_nicely")];

        let (_, verdict) = map_results_to_checklist(&checklist, None, &results);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.required_total, 0);
        assert_eq!(verdict.passed_tests, 1);
    }

    #[test]
    fn test_optional_items_do_not_count_toward_score() {
        let checklist = vec![
            ChecklistItem::new("C1", "Must validate email format", true),
            ChecklistItem::new("C2", "Should render error banner", false),
        ];
        let manifest = manifest_with(vec![
            entry("T1", "test_validate_email_autoqa", &["C1"]),
            entry("T2", "test_render_error_banner_autoqa", &["C2"]),
        ]);
        let results = vec![
            NormalizedTestResult::passed("test_validate_email_autoqa"),
            failed("test_render_error_banner_autoqa"),
        ];

        let (_, verdict) = map_results_to_checklist(&checklist, Some(&manifest), &results);
        assert_eq!(verdict.required_total, 1);
        assert_eq!(verdict.required_passed, 1);
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn test_score_bounds() {
        let checklist = vec![
            ChecklistItem::new("C1", "Must validate email format", true),
            ChecklistItem::new("C2", "Must persist audit records", true),
        ];
        let manifest = manifest_with(vec![entry("T1", "test_validate_email_autoqa", &["C1"])]);
        let results = vec![NormalizedTestResult::passed("test_validate_email_autoqa")];

        let (_, verdict) = map_results_to_checklist(&checklist, Some(&manifest), &results);
        assert!(verdict.score >= 0.0 && verdict.score <= 1.0);
        assert_eq!(verdict.score, 0.5);
        assert!(!verdict.fully_compliant());
    }

    #[test]
    fn test_manifest_entry_without_ids_falls_back_to_fuzzy() {
        let checklist = vec![ChecklistItem::new("C1", "Must validate email format", true)];
        let manifest = manifest_with(vec![entry("T1", "test_validate_email_autoqa", &[])]);
        let results = vec![NormalizedTestResult::passed("test_validate_email_autoqa")];

        let (correlated, verdict) =
            map_results_to_checklist(&checklist, Some(&manifest), &results);
        assert_eq!(correlated[0].checklist_ids, vec!["C1".to_string()]);
        assert_eq!(correlated[0].test_id.as_deref(), Some("T1"));
        assert_eq!(verdict.score, 1.0);
    }
}
