//! Heuristic extraction of acceptance criteria from issue text, checklist
//! merging, and linked-issue resolution for PRs.
//!
//! Extraction is a fixed cascade: three structured section patterns tried
//! in order, first one yielding at least one bullet wins, then a whole-body
//! keyword fallback. The cascade is data-driven so new section headers are
//! additive.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::ChecklistItem;

/// Minimum description length kept after extraction.
const MIN_CRITERION_LEN: usize = 10;

/// Section headers recognized as criteria sections, in priority order.
/// Case-insensitive, optional markdown heading marker, optional colon.
static SECTION_HEADERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^\s*(?:#{1,3}\s*)?Acceptance\s+Criteria:?\s*$",
        r"(?i)^\s*(?:#{1,3}\s*)?AC:?\s*$",
        r"(?i)^\s*(?:#{1,3}\s*)?Requirements:?\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("section header pattern"))
    .collect()
});

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*•]\s+(.+)$").expect("bullet pattern"));

static REQUIREMENT_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[-*•]\s+(.*(?:must|should|need|require|ensure|verify).*)$")
        .expect("requirement bullet pattern")
});

/// Extract acceptance-criteria texts from an issue body.
///
/// Structured sections win over the keyword fallback; items of 10
/// characters or fewer are dropped and duplicates are removed
/// case-insensitively, preserving first-seen order.
pub fn extract_acceptance_criteria(issue_body: &str) -> Vec<String> {
    if issue_body.trim().is_empty() {
        return Vec::new();
    }

    let mut criteria: Vec<String> = Vec::new();

    for header in SECTION_HEADERS.iter() {
        let bullets = section_bullets(issue_body, header);
        if !bullets.is_empty() {
            criteria = bullets;
            break;
        }
    }

    if criteria.is_empty() {
        for line in issue_body.lines() {
            if let Some(caps) = REQUIREMENT_BULLET.captures(line) {
                criteria.push(caps[1].trim().to_string());
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    criteria
        .into_iter()
        .filter(|c| c.len() > MIN_CRITERION_LEN)
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect()
}

/// Bullet lines between a matching section header and the next heading.
fn section_bullets(body: &str, header: &Regex) -> Vec<String> {
    let mut bullets = Vec::new();
    let mut in_section = false;
    for line in body.lines() {
        if in_section {
            // A new markdown heading ends the section.
            if line.trim_start().starts_with("##") {
                break;
            }
            if let Some(caps) = BULLET.captures(line) {
                bullets.push(caps[1].trim().to_string());
            }
        } else if header.is_match(line) {
            in_section = true;
        }
    }
    bullets
}

/// Keywords that mark a criterion as required.
const REQUIRED_KEYWORDS: &[&str] = &["must", "required", "shall", "need"];

/// Keyword-to-tag table applied to new checklist items.
const TAG_KEYWORDS: &[(&[&str], &str)] = &[
    (&["test"], "testing"),
    (&["validation", "validate"], "validation"),
    (&["error", "exception"], "error-handling"),
];

/// Merge externally suggested checklist items with heuristic texts into a
/// final checklist.
///
/// Suggested items are taken verbatim first. A heuristic text is appended
/// only when it is not a case-insensitive substring (either direction) of
/// any already-included description. New items get sequential `C{n}` ids,
/// a `required` flag from keyword presence, and keyword-derived tags.
/// Deterministic for identical input.
pub fn merge_checklist(
    heuristic_texts: &[String],
    suggested: Vec<ChecklistItem>,
) -> Vec<ChecklistItem> {
    let mut items = suggested;
    let mut descriptions: Vec<String> = items.iter().map(|i| i.description.to_lowercase()).collect();

    for text in heuristic_texts {
        let lower = text.to_lowercase();
        let covered = descriptions
            .iter()
            .any(|d| d.contains(&lower) || lower.contains(d.as_str()));
        if covered {
            continue;
        }

        let required = REQUIRED_KEYWORDS.iter().any(|k| lower.contains(k));
        let tags: Vec<String> = TAG_KEYWORDS
            .iter()
            .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, tag)| tag.to_string())
            .collect();

        items.push(
            ChecklistItem::new(format!("C{}", items.len() + 1), text.clone(), required)
                .with_tags(tags),
        );
        descriptions.push(lower);
    }

    items
}

// ---------------------------------------------------------------------------
// Linked-issue resolution
// ---------------------------------------------------------------------------

static ISSUE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("issue ref pattern"));

static CLOSING_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:fixes?|closes?|resolves?):?\s*#(\d+)").expect("closing ref pattern")
});

static BRANCH_ISSUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:issue[-_]?|fix[-_]?)?(\d+)").expect("branch issue pattern")
});

static LABEL_ISSUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)issue[-_]?(\d+)").expect("label issue pattern"));

/// Resolve the issue number a PR refers to, in fixed precedence order:
/// body references (`#123`, then `fixes #123` forms), branch name digits,
/// commit message references, and finally `issue-123` style labels.
pub fn find_linked_issue(
    pr_body: &str,
    labels: &[String],
    branch_name: &str,
    commits: &[String],
) -> Option<u64> {
    if !pr_body.is_empty() {
        if let Some(caps) = ISSUE_REF.captures(pr_body) {
            if let Ok(n) = caps[1].parse() {
                return Some(n);
            }
        }
        if let Some(caps) = CLOSING_REF.captures(pr_body) {
            if let Ok(n) = caps[1].parse() {
                return Some(n);
            }
        }
    }

    if !branch_name.is_empty() {
        if let Some(caps) = BRANCH_ISSUE.captures(branch_name) {
            if let Ok(n) = caps[1].parse() {
                return Some(n);
            }
        }
    }

    for msg in commits {
        if let Some(caps) = ISSUE_REF.captures(msg) {
            if let Ok(n) = caps[1].parse() {
                return Some(n);
            }
        }
    }

    for label in labels {
        if let Some(caps) = LABEL_ISSUE.captures(label) {
            if let Ok(n) = caps[1].parse() {
                return Some(n);
            }
        }
    }

    None
}
