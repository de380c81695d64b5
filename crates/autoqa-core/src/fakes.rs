//! In-memory fakes for the capability traits (testing only).
//!
//! Provides `MemoryRecordStore`, `StaticSuggester`, `StaticExchange`, and
//! `ScriptedRepoClient` that satisfy the trait contracts without any
//! external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::capability::{
    ArtifactMeta, CredentialExchange, CriteriaSuggester, InstallationToken, MergeAck, RecordStore,
    RepositoryClient,
};
use crate::domain::{
    AutoQaError, ChecklistItem, ComplianceVerdict, IssueRecord, PersistedTestResult, PrRecord,
    Result,
};

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Records {
    issues: HashMap<(String, u64), IssueRecord>,
    prs: HashMap<(String, u64), PrRecord>,
    results: Vec<PersistedTestResult>,
    verdicts: HashMap<(String, u64), ComplianceVerdict>,
}

/// In-memory record store backed by `HashMap`s under one lock.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Records>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results saved so far, for assertions.
    pub fn saved_results(&self) -> Vec<PersistedTestResult> {
        self.records.lock().unwrap().results.clone()
    }

    /// Latest verdict stored for a PR, for assertions.
    pub fn verdict(&self, repo: &str, pr_number: u64) -> Option<ComplianceVerdict> {
        self.records
            .lock()
            .unwrap()
            .verdicts
            .get(&(repo.to_string(), pr_number))
            .cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_issue(&self, repo: &str, issue_number: u64) -> Result<Option<IssueRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .issues
            .get(&(repo.to_string(), issue_number))
            .cloned())
    }

    async fn save_issue(&self, record: IssueRecord) -> Result<()> {
        let key = (record.repo.clone(), record.issue_number);
        self.records.lock().unwrap().issues.insert(key, record);
        Ok(())
    }

    async fn get_pr(&self, repo: &str, pr_number: u64) -> Result<Option<PrRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .prs
            .get(&(repo.to_string(), pr_number))
            .cloned())
    }

    async fn find_pr_by_head_sha(&self, repo: &str, head_sha: &str) -> Result<Option<PrRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .prs
            .values()
            .filter(|pr| pr.repo == repo && pr.head_sha == head_sha)
            .max_by_key(|pr| pr.updated_at)
            .cloned())
    }

    async fn save_pr(&self, record: PrRecord) -> Result<()> {
        let key = (record.repo.clone(), record.pr_number);
        self.records.lock().unwrap().prs.insert(key, record);
        Ok(())
    }

    async fn save_test_results(&self, results: Vec<PersistedTestResult>) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(first) = results.first() {
            let (repo, pr) = (first.repo.clone(), first.pr_number);
            records
                .results
                .retain(|r| !(r.repo == repo && r.pr_number == pr));
        }
        records.results.extend(results);
        Ok(())
    }

    async fn save_verdict(
        &self,
        repo: &str,
        pr_number: u64,
        verdict: ComplianceVerdict,
    ) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .verdicts
            .insert((repo.to_string(), pr_number), verdict);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticSuggester
// ---------------------------------------------------------------------------

/// Suggester returning a fixed item list, or failing when constructed
/// with `failing()`.
pub struct StaticSuggester {
    items: Vec<ChecklistItem>,
    fail: bool,
}

impl StaticSuggester {
    pub fn new(items: Vec<ChecklistItem>) -> Self {
        Self { items, fail: false }
    }

    /// A suggester whose every call fails, for exercising the
    /// swallow-and-degrade path.
    pub fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CriteriaSuggester for StaticSuggester {
    async fn suggest(&self, _issue_text: &str) -> Result<Vec<ChecklistItem>> {
        if self.fail {
            return Err(AutoQaError::Upstream {
                status: 500,
                detail: "suggestion backend unavailable".to_string(),
            });
        }
        Ok(self.items.clone())
    }
}

// ---------------------------------------------------------------------------
// StaticExchange
// ---------------------------------------------------------------------------

/// Credential exchange handing out hour-long tokens without any network.
#[derive(Debug, Default)]
pub struct StaticExchange;

#[async_trait]
impl CredentialExchange for StaticExchange {
    async fn exchange_installation_token(
        &self,
        _app_assertion: &str,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        Ok(InstallationToken {
            token: format!("fake-token-{installation_id}"),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedRepoClient
// ---------------------------------------------------------------------------

/// Repository client returning pre-scripted responses and recording the
/// comments and merge attempts it receives.
#[derive(Debug, Default)]
pub struct ScriptedRepoClient {
    pub diff: Mutex<String>,
    pub files: Mutex<Vec<String>>,
    pub artifacts: Mutex<Vec<ArtifactMeta>>,
    /// Artifact id -> raw report bytes.
    pub artifact_bodies: Mutex<HashMap<u64, Vec<u8>>>,
    pub merge_ack: Mutex<MergeAck>,
    pub comments: Mutex<Vec<(u64, String)>>,
    pub merge_attempts: Mutex<Vec<u64>>,
}

impl ScriptedRepoClient {
    pub fn new() -> Self {
        Self {
            merge_ack: Mutex::new(MergeAck {
                merged: true,
                sha: Some("merged-sha".to_string()),
                message: None,
            }),
            ..Self::default()
        }
    }

    pub fn set_diff(&self, diff: &str) {
        *self.diff.lock().unwrap() = diff.to_string();
    }

    pub fn set_files(&self, files: &[&str]) {
        *self.files.lock().unwrap() = files.iter().map(|s| s.to_string()).collect();
    }

    pub fn add_artifact(&self, id: u64, name: &str, body: &[u8]) {
        self.artifacts.lock().unwrap().push(ArtifactMeta {
            id,
            name: name.to_string(),
        });
        self.artifact_bodies.lock().unwrap().insert(id, body.to_vec());
    }

    pub fn set_merge_ack(&self, ack: MergeAck) {
        *self.merge_ack.lock().unwrap() = ack;
    }

    pub fn comments_posted(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn merge_attempt_count(&self) -> usize {
        self.merge_attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl RepositoryClient for ScriptedRepoClient {
    async fn post_comment(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        subject_number: u64,
        body: &str,
    ) -> Result<()> {
        self.comments
            .lock()
            .unwrap()
            .push((subject_number, body.to_string()));
        Ok(())
    }

    async fn get_pr_diff(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        _pr_number: u64,
    ) -> Result<String> {
        Ok(self.diff.lock().unwrap().clone())
    }

    async fn list_pr_files(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        _pr_number: u64,
    ) -> Result<Vec<String>> {
        Ok(self.files.lock().unwrap().clone())
    }

    async fn list_artifacts(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        _run_id: u64,
    ) -> Result<Vec<ArtifactMeta>> {
        Ok(self.artifacts.lock().unwrap().clone())
    }

    async fn download_artifact(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        artifact_id: u64,
    ) -> Result<Vec<u8>> {
        self.artifact_bodies
            .lock()
            .unwrap()
            .get(&artifact_id)
            .cloned()
            .ok_or(AutoQaError::Upstream {
                status: 404,
                detail: format!("artifact {artifact_id} not found"),
            })
    }

    async fn get_branch_protection(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        _branch: &str,
    ) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }

    async fn merge_pull_request(
        &self,
        _installation_id: u64,
        _owner: &str,
        _repo: &str,
        pr_number: u64,
        _method: &str,
    ) -> Result<MergeAck> {
        self.merge_attempts.lock().unwrap().push(pr_number);
        Ok(self.merge_ack.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_declines_merge() {
        // Default construction must work for every fake; a default ack is
        // a declined merge so a test that forgets to script one cannot
        // accidentally observe success.
        let client = ScriptedRepoClient::default();
        let ack = client.merge_ack.lock().unwrap().clone();
        assert!(!ack.merged);
        assert!(ack.sha.is_none());
        assert_eq!(ack, MergeAck::default());
    }

    #[test]
    fn test_new_client_scripts_a_confirmed_merge() {
        let client = ScriptedRepoClient::new();
        let ack = client.merge_ack.lock().unwrap().clone();
        assert!(ack.merged);
        assert_eq!(ack.sha.as_deref(), Some("merged-sha"));
    }
}
