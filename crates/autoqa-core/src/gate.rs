//! Merge gate: turns a compliance verdict into a merge decision.
//!
//! State machine: `Pending -> {Merged, Blocked, Skipped}`. The gate merges
//! only when auto-merge is enabled, every required checklist item passed,
//! and there is at least one required item (an unmeasured checklist never
//! auto-merges). Provider-side failures keep the provider's message
//! verbatim for operator visibility; a failed merge is never silently
//! reported as success.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::capability::RepositoryClient;
use crate::domain::{AutoQaError, ComplianceVerdict};

/// Terminal outcome of a merge-gate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// The provider confirmed the merge.
    Merged { sha: Option<String> },
    /// The merge was not performed; `message` explains why (compliance
    /// shortfall or the provider's own message, verbatim).
    Blocked { message: String },
    /// Auto-merge is disabled; the provider was never called.
    Skipped { message: String },
}

/// Target of one merge attempt.
#[derive(Debug, Clone)]
pub struct MergeTarget<'a> {
    pub installation_id: u64,
    pub owner: &'a str,
    pub repo: &'a str,
    pub pr_number: u64,
    /// Base branch, for branch-protection awareness.
    pub base_branch: &'a str,
}

/// Gate configuration: the auto-merge flag and merge method.
#[derive(Debug, Clone)]
pub struct MergeGate {
    auto_merge_enabled: bool,
    merge_method: String,
}

impl MergeGate {
    pub fn new(auto_merge_enabled: bool) -> Self {
        Self {
            auto_merge_enabled,
            merge_method: "squash".to_string(),
        }
    }

    pub fn with_merge_method(mut self, method: impl Into<String>) -> Self {
        self.merge_method = method.into();
        self
    }

    /// Evaluate the verdict and, when it allows, attempt the merge.
    pub async fn attempt(
        &self,
        client: &dyn RepositoryClient,
        target: MergeTarget<'_>,
        verdict: &ComplianceVerdict,
    ) -> MergeOutcome {
        if !self.auto_merge_enabled {
            return MergeOutcome::Skipped {
                message: "Auto-merge is disabled".to_string(),
            };
        }

        if !verdict.fully_compliant() {
            let message = if verdict.required_total == 0 {
                "No required checklist items to verify; refusing to auto-merge".to_string()
            } else {
                format!(
                    "{}/{} required checklist items passed",
                    verdict.required_passed, verdict.required_total
                )
            };
            return MergeOutcome::Blocked { message };
        }

        // Branch-protection awareness is best-effort: rules are logged so
        // the provider's own enforcement failures are explainable, but a
        // lookup failure does not block the attempt on its own.
        match client
            .get_branch_protection(
                target.installation_id,
                target.owner,
                target.repo,
                target.base_branch,
            )
            .await
        {
            Ok(Some(rules)) => {
                info!(
                    event = "gate.branch_protection",
                    pr_number = target.pr_number,
                    rules = %rules,
                );
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    event = "gate.branch_protection_lookup_failed",
                    pr_number = target.pr_number,
                    error = %e,
                );
            }
        }

        match client
            .merge_pull_request(
                target.installation_id,
                target.owner,
                target.repo,
                target.pr_number,
                &self.merge_method,
            )
            .await
        {
            Ok(ack) if ack.merged => MergeOutcome::Merged { sha: ack.sha },
            Ok(ack) => MergeOutcome::Blocked {
                message: ack
                    .message
                    .unwrap_or_else(|| "Merge failed".to_string()),
            },
            Err(AutoQaError::Upstream { status, detail }) => MergeOutcome::Blocked {
                message: format!("provider rejected merge (status {status}): {detail}"),
            },
            Err(e) => MergeOutcome::Blocked {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::capability::{ArtifactMeta, MergeAck};
    use crate::domain::Result;

    struct ScriptedClient {
        ack: Result<MergeAck>,
        merge_calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(ack: Result<MergeAck>) -> Self {
            Self {
                ack,
                merge_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RepositoryClient for ScriptedClient {
        async fn post_comment(&self, _: u64, _: &str, _: &str, _: u64, _: &str) -> Result<()> {
            Ok(())
        }
        async fn get_pr_diff(&self, _: u64, _: &str, _: &str, _: u64) -> Result<String> {
            Ok(String::new())
        }
        async fn list_pr_files(&self, _: u64, _: &str, _: &str, _: u64) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn list_artifacts(
            &self,
            _: u64,
            _: &str,
            _: &str,
            _: u64,
        ) -> Result<Vec<ArtifactMeta>> {
            Ok(Vec::new())
        }
        async fn download_artifact(&self, _: u64, _: &str, _: &str, _: u64) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn get_branch_protection(
            &self,
            _: u64,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }
        async fn merge_pull_request(
            &self,
            _: u64,
            _: &str,
            _: &str,
            _: u64,
            _: &str,
        ) -> Result<MergeAck> {
            self.merge_calls.fetch_add(1, Ordering::SeqCst);
            match &self.ack {
                Ok(ack) => Ok(ack.clone()),
                Err(AutoQaError::Upstream { status, detail }) => Err(AutoQaError::Upstream {
                    status: *status,
                    detail: detail.clone(),
                }),
                Err(e) => Err(AutoQaError::Auth(e.to_string())),
            }
        }
    }

    fn target() -> MergeTarget<'static> {
        MergeTarget {
            installation_id: 1,
            owner: "acme",
            repo: "widgets",
            pr_number: 42,
            base_branch: "main",
        }
    }

    fn compliant() -> ComplianceVerdict {
        ComplianceVerdict {
            score: 1.0,
            required_passed: 2,
            required_total: 2,
            total_tests: 2,
            passed_tests: 2,
        }
    }

    #[tokio::test]
    async fn test_disabled_gate_skips_without_provider_call() {
        let client = ScriptedClient::new(Ok(MergeAck {
            merged: true,
            sha: None,
            message: None,
        }));
        let gate = MergeGate::new(false);
        let outcome = gate.attempt(&client, target(), &compliant()).await;
        assert_eq!(
            outcome,
            MergeOutcome::Skipped {
                message: "Auto-merge is disabled".to_string()
            }
        );
        assert_eq!(client.merge_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compliant_verdict_merges() {
        let client = ScriptedClient::new(Ok(MergeAck {
            merged: true,
            sha: Some("abc123".to_string()),
            message: None,
        }));
        let gate = MergeGate::new(true);
        let outcome = gate.attempt(&client, target(), &compliant()).await;
        assert_eq!(
            outcome,
            MergeOutcome::Merged {
                sha: Some("abc123".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_shortfall_blocks_without_provider_call() {
        let client = ScriptedClient::new(Ok(MergeAck {
            merged: true,
            sha: None,
            message: None,
        }));
        let gate = MergeGate::new(true);
        let verdict = ComplianceVerdict {
            score: 0.5,
            required_passed: 1,
            required_total: 2,
            total_tests: 2,
            passed_tests: 1,
        };
        let outcome = gate.attempt(&client, target(), &verdict).await;
        assert!(matches!(
            outcome,
            MergeOutcome::Blocked { ref message } if message.contains("1/2")
        ));
        assert_eq!(client.merge_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_required_items_never_merges() {
        let client = ScriptedClient::new(Ok(MergeAck {
            merged: true,
            sha: None,
            message: None,
        }));
        let gate = MergeGate::new(true);
        let verdict = ComplianceVerdict {
            score: 0.0,
            required_passed: 0,
            required_total: 0,
            total_tests: 5,
            passed_tests: 5,
        };
        let outcome = gate.attempt(&client, target(), &verdict).await;
        assert!(matches!(outcome, MergeOutcome::Blocked { .. }));
        assert_eq!(client.merge_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_merged_false_blocks() {
        let client = ScriptedClient::new(Ok(MergeAck {
            merged: false,
            sha: None,
            message: Some("Pull Request is not mergeable".to_string()),
        }));
        let gate = MergeGate::new(true);
        let outcome = gate.attempt(&client, target(), &compliant()).await;
        assert_eq!(
            outcome,
            MergeOutcome::Blocked {
                message: "Pull Request is not mergeable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_provider_error_message_retained() {
        let client = ScriptedClient::new(Err(AutoQaError::Upstream {
            status: 405,
            detail: "Required status check \"ci\" is expected".to_string(),
        }));
        let gate = MergeGate::new(true);
        let outcome = gate.attempt(&client, target(), &compliant()).await;
        assert!(matches!(
            outcome,
            MergeOutcome::Blocked { ref message }
                if message.contains("405") && message.contains("Required status check")
        ));
    }
}
