//! Test manifest types synthesized from a PR diff.
//!
//! A manifest is generated once per PR synchronization and owned by the
//! PR record until the next synchronization overwrites it.

use serde::{Deserialize, Serialize};

/// Kind of a changed symbol found in a diff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
}

/// A changed symbol (function or class) extracted from a unified diff.
///
/// Ephemeral: produced and consumed within one diff-analysis pass,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolChange {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    /// Approximate post-image line number (hunk start + offset). Diff line
    /// numbers do not map 1:1 across multiple hunks; this is an accepted
    /// precision loss.
    pub line_number: Option<u32>,
}

/// One expected test in a PR's test manifest, with links back to the
/// checklist items it is meant to satisfy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestManifestEntry {
    /// Sequential identifier within the manifest ("T1", "T2", ...).
    pub test_id: String,
    /// Deterministic test name (e.g., "test_validate_email_autoqa").
    pub name: String,
    /// Test framework the entry targets.
    pub framework: String,
    /// File the test exercises.
    pub target_file: String,
    /// Checklist item ids this test is linked to, in link order.
    #[serde(default)]
    pub checklist_ids: Vec<String>,
}

/// The set of tests a PR synchronization is expected to satisfy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestManifest {
    pub pr_number: u64,
    pub head_sha: String,
    pub entries: Vec<TestManifestEntry>,
}

impl TestManifest {
    /// Look up an entry by test name.
    pub fn entry_by_name(&self, name: &str) -> Option<&TestManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
