//! GitHub REST client for the AutoQA provider capabilities.
//!
//! Two pieces: [`GitHubExchange`] performs the app-assertion to
//! installation-token exchange, and [`GitHubClient`] implements the
//! repository surface, pulling a cached token from the credential broker
//! per call. Both speak the versioned REST media types.

use std::sync::Arc;

use async_trait::async_trait;
use autoqa_core::{
    ArtifactMeta, AutoQaError, CredentialBroker, CredentialExchange, InstallationToken, MergeAck,
    RepositoryClient, Result, Settings,
};
use serde::Deserialize;
use tracing::debug;

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const USER_AGENT: &str = concat!("autoqa/", env!("CARGO_PKG_VERSION"));

fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AutoQaError::Upstream {
            status: 0,
            detail: format!("failed to build HTTP client: {e}"),
        })
}

/// Map a non-success response to the error taxonomy.
///
/// Rate-limit exhaustion is the distinguished `RateLimited` variant so
/// callers can back off instead of treating it as a plain upstream fault.
fn map_status(status: u16, body: &str) -> AutoQaError {
    let lowered = body.to_lowercase();
    if status == 429 || (status == 403 && lowered.contains("rate limit")) {
        return AutoQaError::RateLimited {
            detail: body.to_string(),
        };
    }
    AutoQaError::Upstream {
        status,
        detail: body.to_string(),
    }
}

async fn error_for(response: reqwest::Response) -> AutoQaError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    map_status(status, &body)
}

fn transport_error(e: reqwest::Error) -> AutoQaError {
    AutoQaError::Upstream {
        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
        detail: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// GitHubExchange
// ---------------------------------------------------------------------------

/// Exchanges a signed app assertion for an installation token via
/// `POST /app/installations/{id}/access_tokens`.
pub struct GitHubExchange {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl GitHubExchange {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: build_http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point at a different API base (GitHub Enterprise, test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl CredentialExchange for GitHubExchange {
    async fn exchange_installation_token(
        &self,
        app_assertion: &str,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        let url = format!(
            "{}/app/installations/{installation_id}/access_tokens",
            self.api_base
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(app_assertion)
            .header(reqwest::header::ACCEPT, ACCEPT_JSON)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AutoQaError::Auth(format!(
                "installation token exchange failed (status {status}): {body}"
            )));
        }

        let parsed: AccessTokenResponse = response.json().await.map_err(transport_error)?;
        debug!(
            event = "github.token_exchanged",
            installation_id,
            expires_at = %parsed.expires_at,
        );
        Ok(InstallationToken {
            token: parsed.token,
            expires_at: parsed.expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PrFileEntry {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactEntry {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactListResponse {
    artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Repository surface backed by the GitHub REST API.
///
/// Each call resolves the installation's token through the broker, so a
/// long-lived client never holds a stale credential.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    broker: Arc<CredentialBroker>,
}

impl GitHubClient {
    /// Build a client for the app identity in `settings`.
    pub fn new(settings: &Settings) -> Result<Self> {
        let exchange = Arc::new(GitHubExchange::new()?);
        let broker = Arc::new(CredentialBroker::new(
            settings.app_id.clone(),
            settings.private_key_pem.clone(),
            exchange,
        ));
        Ok(Self {
            http: build_http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            broker,
        })
    }

    /// Build a client around an existing broker (shared token cache).
    pub fn with_broker(broker: Arc<CredentialBroker>) -> Result<Self> {
        Ok(Self {
            http: build_http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            broker,
        })
    }

    /// Point at a different API base (GitHub Enterprise, test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn get(
        &self,
        installation_id: u64,
        path: &str,
        accept: &str,
    ) -> Result<reqwest::Response> {
        let token = self.broker.get_installation_token(installation_id).await?;
        self.http
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(transport_error)
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn post_comment(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        subject_number: u64,
        body: &str,
    ) -> Result<()> {
        let token = self.broker.get_installation_token(installation_id).await?;
        let url = format!(
            "{}/repos/{owner}/{repo}/issues/{subject_number}/comments",
            self.api_base
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ACCEPT_JSON)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        Ok(())
    }

    async fn get_pr_diff(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<String> {
        let path = format!("/repos/{owner}/{repo}/pulls/{pr_number}");
        let response = self.get(installation_id, &path, ACCEPT_DIFF).await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        response.text().await.map_err(transport_error)
    }

    async fn list_pr_files(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<String>> {
        let path = format!("/repos/{owner}/{repo}/pulls/{pr_number}/files?per_page=100");
        let response = self.get(installation_id, &path, ACCEPT_JSON).await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        let files: Vec<PrFileEntry> = response.json().await.map_err(transport_error)?;
        Ok(files.into_iter().map(|f| f.filename).collect())
    }

    async fn list_artifacts(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<ArtifactMeta>> {
        let path = format!("/repos/{owner}/{repo}/actions/runs/{run_id}/artifacts");
        let response = self.get(installation_id, &path, ACCEPT_JSON).await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        let listing: ArtifactListResponse = response.json().await.map_err(transport_error)?;
        Ok(listing
            .artifacts
            .into_iter()
            .map(|a| ArtifactMeta {
                id: a.id,
                name: a.name,
            })
            .collect())
    }

    /// Download an artifact's bytes as served by the provider.
    ///
    /// The archive endpoint redirects to a short-lived download URL; the
    /// client follows it. Bytes are handed to the caller unaltered.
    async fn download_artifact(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        artifact_id: u64,
    ) -> Result<Vec<u8>> {
        let path = format!("/repos/{owner}/{repo}/actions/artifacts/{artifact_id}/zip");
        let response = self.get(installation_id, &path, ACCEPT_JSON).await?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    async fn get_branch_protection(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<serde_json::Value>> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}/protection");
        let response = self.get(installation_id, &path, ACCEPT_JSON).await?;
        // 404 means the branch has no protection rules configured.
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        let rules: serde_json::Value = response.json().await.map_err(transport_error)?;
        Ok(Some(rules))
    }

    async fn merge_pull_request(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
        method: &str,
    ) -> Result<MergeAck> {
        let token = self.broker.get_installation_token(installation_id).await?;
        let url = format!("{}/repos/{owner}/{repo}/pulls/{pr_number}/merge", self.api_base);
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ACCEPT_JSON)
            .json(&serde_json::json!({ "merge_method": method }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        // 405 (not mergeable) and 409 (head moved) carry an explanatory
        // message; surface them as a declined ack, not a transport fault.
        if status == 405 || status == 409 {
            let parsed: MergeResponse = response.json().await.unwrap_or(MergeResponse {
                merged: false,
                sha: None,
                message: None,
            });
            return Ok(MergeAck {
                merged: false,
                sha: parsed.sha,
                message: parsed.message,
            });
        }
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        let parsed: MergeResponse = response.json().await.map_err(transport_error)?;
        Ok(MergeAck {
            merged: parsed.merged,
            sha: parsed.sha,
            message: parsed.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_mapped_from_403() {
        let err = map_status(403, "API rate limit exceeded for installation");
        assert!(matches!(err, AutoQaError::RateLimited { .. }));
    }

    #[test]
    fn test_429_is_rate_limited() {
        let err = map_status(429, "slow down");
        assert!(matches!(err, AutoQaError::RateLimited { .. }));
    }

    #[test]
    fn test_plain_403_is_upstream() {
        let err = map_status(403, "Resource not accessible by integration");
        assert!(matches!(err, AutoQaError::Upstream { status: 403, .. }));
    }

    #[test]
    fn test_500_is_upstream() {
        let err = map_status(500, "boom");
        assert!(matches!(err, AutoQaError::Upstream { status: 500, .. }));
    }

    #[test]
    fn test_merge_response_defaults() {
        let parsed: MergeResponse =
            serde_json::from_str(r#"{"message":"Pull Request is not mergeable"}"#)
                .expect("deserialize");
        assert!(!parsed.merged);
        assert!(parsed.sha.is_none());
        assert_eq!(
            parsed.message.as_deref(),
            Some("Pull Request is not mergeable")
        );
    }

    #[test]
    fn test_api_base_override() {
        let exchange = GitHubExchange::new()
            .expect("client")
            .with_api_base("https://ghe.example.com/api/v3");
        assert_eq!(exchange.api_base, "https://ghe.example.com/api/v3");
    }
}
