//! Capability traits the core consumes but does not implement.
//!
//! These are the seams to the outside world: credential exchange against
//! the hosting provider, the provider's REST surface, optional LLM-backed
//! criteria suggestion, and record persistence. Implementations live
//! outside the core (`autoqa-github` for the provider, whatever storage
//! backend the deployment uses); in-memory fakes for all of them are in
//! the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChecklistItem, ComplianceVerdict, IssueRecord, PersistedTestResult, PrRecord, Result,
};

// ---------------------------------------------------------------------------
// CredentialExchange
// ---------------------------------------------------------------------------

/// A short-lived credential scoped to one app installation.
///
/// Never persisted to durable storage; lifetime is process memory only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchange a signed app-level assertion for an installation token.
///
/// Fails with `AutoQaError::Auth` on a non-2xx provider response.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange_installation_token(
        &self,
        app_assertion: &str,
        installation_id: u64,
    ) -> Result<InstallationToken>;
}

// ---------------------------------------------------------------------------
// RepositoryClient
// ---------------------------------------------------------------------------

/// Metadata for a workflow-run artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub id: u64,
    pub name: String,
}

/// Provider response to a merge attempt.
///
/// The default ack is a declined merge; only an explicit `merged: true`
/// from the provider counts as success.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeAck {
    pub merged: bool,
    pub sha: Option<String>,
    pub message: Option<String>,
}

/// Narrow surface of the hosting provider's REST API consumed by the core.
///
/// Every method fails with `AutoQaError::Upstream { status, detail }` on a
/// provider-side failure; rate-limit responses are the distinguished
/// `AutoQaError::RateLimited`. The `installation_id` selects which
/// installation's credentials authenticate the call.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Post a comment on an issue or pull request.
    async fn post_comment(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        subject_number: u64,
        body: &str,
    ) -> Result<()>;

    /// Fetch the unified diff for a pull request.
    async fn get_pr_diff(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<String>;

    /// List the paths of files changed in a pull request.
    async fn list_pr_files(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<String>>;

    /// List artifacts produced by a workflow run.
    async fn list_artifacts(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<ArtifactMeta>>;

    /// Download an artifact's bytes.
    async fn download_artifact(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        artifact_id: u64,
    ) -> Result<Vec<u8>>;

    /// Fetch branch protection rules, or `None` when the branch has none.
    async fn get_branch_protection(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<serde_json::Value>>;

    /// Attempt to merge a pull request with the given method ("squash", ...).
    async fn merge_pull_request(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
        method: &str,
    ) -> Result<MergeAck>;
}

// ---------------------------------------------------------------------------
// CriteriaSuggester
// ---------------------------------------------------------------------------

/// Optional externally sourced checklist suggestion (typically LLM-backed).
///
/// Absence means heuristic-only extraction. Any failure is swallowed by
/// the caller and treated as an empty suggestion list; a suggester can
/// never block heuristic extraction.
#[async_trait]
pub trait CriteriaSuggester: Send + Sync {
    async fn suggest(&self, issue_text: &str) -> Result<Vec<ChecklistItem>>;
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Persistence capability for issue/PR aggregates and evaluation output.
///
/// The storage engine, schema, and migrations are external collaborators;
/// the core only speaks this trait. Results and verdicts for a PR are
/// superseded wholesale on each new workflow run.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_issue(&self, repo: &str, issue_number: u64) -> Result<Option<IssueRecord>>;

    async fn save_issue(&self, record: IssueRecord) -> Result<()>;

    async fn get_pr(&self, repo: &str, pr_number: u64) -> Result<Option<PrRecord>>;

    /// Most recently updated PR with the given head SHA, if any.
    async fn find_pr_by_head_sha(&self, repo: &str, head_sha: &str) -> Result<Option<PrRecord>>;

    async fn save_pr(&self, record: PrRecord) -> Result<()>;

    /// Replace the stored results for the PR evaluation cycle they belong to.
    async fn save_test_results(&self, results: Vec<PersistedTestResult>) -> Result<()>;

    /// Record the verdict for a PR's latest evaluation cycle.
    async fn save_verdict(
        &self,
        repo: &str,
        pr_number: u64,
        verdict: ComplianceVerdict,
    ) -> Result<()>;
}
