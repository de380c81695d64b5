//! Markdown rendering for user-visible comments.
//!
//! Comments always explain what was found, including guidance when no
//! acceptance criteria could be extracted. Never a raw error dump.

use crate::domain::{ChecklistItem, ComplianceVerdict};
use crate::gate::MergeOutcome;

/// Render the checklist comment posted on an issue after extraction.
pub fn render_checklist_comment(items: &[ChecklistItem]) -> String {
    let mut out = String::new();
    out.push_str("## AutoQA Checklist\n\n");
    out.push_str("This checklist was automatically generated from the issue description.\n\n");

    if items.is_empty() {
        out.push_str("No acceptance criteria found in the issue description.\n");
        out.push_str("Please add acceptance criteria using a section like:\n\n");
        out.push_str("```\n## Acceptance Criteria\n- Criterion 1\n- Criterion 2\n```\n");
        return out;
    }

    for item in items {
        let badge = if item.required { "**Required**" } else { "Optional" };
        out.push_str(&format!(
            "- [ ] **{}**: {} {}\n",
            item.id, item.description, badge
        ));
        if !item.tags.is_empty() {
            let tags: Vec<String> = item.tags.iter().map(|t| format!("`{t}`")).collect();
            out.push_str(&format!("  {}\n", tags.join(" ")));
        }
    }
    out
}

/// Render the compliance report comment posted on a PR after correlation.
pub fn render_report_comment(verdict: &ComplianceVerdict, outcome: &MergeOutcome) -> String {
    let mut out = String::new();
    out.push_str("## AutoQA Review Report\n\n");
    out.push_str(&format!(
        "**Compliance Score:** {:.0}%\n\n",
        verdict.score * 100.0
    ));
    out.push_str(&format!(
        "**Required Items Passed:** {}/{}\n\n",
        verdict.required_passed, verdict.required_total
    ));

    out.push_str("### Test Results\n\n");
    out.push_str(&format!("- Total Tests: {}\n", verdict.total_tests));
    out.push_str(&format!("- Passed: {}\n", verdict.passed_tests));
    out.push_str(&format!(
        "- Failed: {}\n\n",
        verdict.total_tests - verdict.passed_tests
    ));

    if verdict.fully_compliant() {
        out.push_str("All required checklist items passed.\n");
    } else if verdict.required_total == 0 {
        out.push_str("No required checklist items were found for this PR, so compliance could not be measured.\n");
    } else {
        out.push_str(&format!(
            "{} required items still need attention.\n",
            verdict.required_total - verdict.required_passed
        ));
    }

    match outcome {
        MergeOutcome::Merged { sha } => {
            out.push_str("\n**Auto-merge:** merged");
            if let Some(sha) = sha {
                out.push_str(&format!(" ({sha})"));
            }
            out.push('\n');
        }
        MergeOutcome::Blocked { message } => {
            out.push_str(&format!("\n**Auto-merge:** blocked — {message}\n"));
        }
        MergeOutcome::Skipped { message } => {
            out.push_str(&format!("\n**Auto-merge:** skipped — {message}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_checklist_includes_guidance() {
        let comment = render_checklist_comment(&[]);
        assert!(comment.contains("No acceptance criteria found"));
        assert!(comment.contains("## Acceptance Criteria"));
    }

    #[test]
    fn test_checklist_items_rendered_with_badges() {
        let items = vec![
            ChecklistItem::new("C1", "Must validate email format", true)
                .with_tags(vec!["validation".to_string()]),
            ChecklistItem::new("C2", "Should show errors", false),
        ];
        let comment = render_checklist_comment(&items);
        assert!(comment.contains("**C1**: Must validate email format **Required**"));
        assert!(comment.contains("`validation`"));
        assert!(comment.contains("**C2**: Should show errors Optional"));
    }

    #[test]
    fn test_report_comment_summarizes_verdict() {
        let verdict = ComplianceVerdict {
            score: 0.5,
            required_passed: 1,
            required_total: 2,
            total_tests: 4,
            passed_tests: 3,
        };
        let comment = render_report_comment(
            &verdict,
            &MergeOutcome::Skipped {
                message: "Auto-merge is disabled".to_string(),
            },
        );
        assert!(comment.contains("**Compliance Score:** 50%"));
        assert!(comment.contains("1/2"));
        assert!(comment.contains("1 required items still need attention"));
        assert!(comment.contains("skipped — Auto-merge is disabled"));
    }

    #[test]
    fn test_report_comment_blocked_keeps_provider_message() {
        let verdict = ComplianceVerdict {
            score: 1.0,
            required_passed: 1,
            required_total: 1,
            total_tests: 1,
            passed_tests: 1,
        };
        let comment = render_report_comment(
            &verdict,
            &MergeOutcome::Blocked {
                message: "Pull Request is not mergeable".to_string(),
            },
        );
        assert!(comment.contains("blocked — Pull Request is not mergeable"));
    }
}
