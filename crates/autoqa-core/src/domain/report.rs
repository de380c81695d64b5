//! Normalized test results and the compliance verdict computed from them.
//!
//! Both are owned by a PR evaluation cycle: a new workflow run supersedes
//! the previous run's results and verdict wholesale. Nothing here is ever
//! mutated in place.

use serde::{Deserialize, Serialize};

/// Outcome of a single test case in a normalized report.
///
/// Classification precedence when multiple child elements are present in
/// the source report: failure > error > skipped > passed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

/// A single test result normalized from a machine-readable report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedTestResult {
    pub name: String,
    /// Classname from the report, falling back to the owning suite's name.
    pub classname: Option<String>,
    pub status: TestStatus,
    /// Wall-clock duration in seconds, when reported.
    pub duration: Option<f64>,
    pub failure_message: Option<String>,
    pub failure_type: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl NormalizedTestResult {
    /// A passed result with only a name, for construction in tests and
    /// fallback paths.
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classname: None,
            status: TestStatus::Passed,
            duration: None,
            failure_message: None,
            failure_type: None,
            stdout: None,
            stderr: None,
        }
    }
}

/// A test result persisted against a PR evaluation cycle, annotated with
/// the checklist items it was linked to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedTestResult {
    pub pr_number: u64,
    pub repo: String,
    /// Manifest test id when the result matched a manifest entry.
    pub test_id: Option<String>,
    pub name: String,
    pub status: TestStatus,
    pub checklist_ids: Vec<String>,
}

/// The computed pass ratio over required checklist items for one CI run.
///
/// Derived data: recomputed from scratch on every workflow-completion
/// event, never merged with a prior verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceVerdict {
    /// `required_passed / required_total`, or 0.0 when there are no
    /// required items. A checklist with zero required items can never
    /// reach full compliance by this metric; accepted behavior.
    pub score: f64,
    pub required_passed: usize,
    pub required_total: usize,
    pub total_tests: usize,
    pub passed_tests: usize,
}

impl ComplianceVerdict {
    /// Whether every required item is covered by a passed result.
    ///
    /// False when there are no required items at all, matching the merge
    /// gate's refusal to auto-merge an unmeasured checklist.
    pub fn fully_compliant(&self) -> bool {
        self.required_total > 0 && self.required_passed == self.required_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&TestStatus::Skipped).expect("serialize"),
            "\"skipped\""
        );
    }

    #[test]
    fn test_fully_compliant_requires_nonzero_total() {
        let verdict = ComplianceVerdict {
            score: 0.0,
            required_passed: 0,
            required_total: 0,
            total_tests: 3,
            passed_tests: 3,
        };
        assert!(!verdict.fully_compliant());
    }

    #[test]
    fn test_fully_compliant_when_all_required_pass() {
        let verdict = ComplianceVerdict {
            score: 1.0,
            required_passed: 2,
            required_total: 2,
            total_tests: 2,
            passed_tests: 2,
        };
        assert!(verdict.fully_compliant());
    }
}
