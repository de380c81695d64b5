//! Persisted aggregate records for issues and pull requests.
//!
//! Checklists are owned by their issue record; test manifests by their PR
//! record. Both are replaced wholesale on regeneration, never patched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checklist::ChecklistItem;
use super::manifest::TestManifest;

/// An issue and its generated checklist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord {
    pub repo: String,
    pub issue_number: u64,
    pub checklist: Vec<ChecklistItem>,
    /// Issue state as last reported ("open", "closed").
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Validation lifecycle of a PR record between synchronization and verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Evaluated,
}

/// A pull request, its linked issue, and its current test manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrRecord {
    pub repo: String,
    pub pr_number: u64,
    /// Issue number this PR was linked to, when resolution succeeded.
    pub issue_number: Option<u64>,
    pub head_sha: String,
    /// Manifest from the most recent synchronization; overwritten on resync.
    pub manifest: Option<TestManifest>,
    pub validation_status: ValidationStatus,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status_serde() {
        assert_eq!(
            serde_json::to_string(&ValidationStatus::Pending).expect("serialize"),
            "\"pending\""
        );
    }
}
