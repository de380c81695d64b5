//! Inbound webhook event shapes and payload validation.
//!
//! Raw event bodies deserialize into one of three typed payloads keyed by
//! the event type (`issues`, `pull_request`, `workflow_run`). A missing
//! required field at any level is a fatal [`ValidationError`] for that
//! event; there is no partial processing.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A single webhook delivery, as received from the transport layer.
///
/// The raw body is kept as bytes so the signature can be verified over
/// exactly what was sent, before any JSON parsing happens.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event type header (e.g., "issues", "pull_request", "workflow_run").
    pub event_type: String,
    /// Action within the event type (e.g., "opened", "completed").
    pub action: String,
    /// Unique delivery identifier, used only for deduplication.
    pub delivery_id: String,
    /// Signature header in `<algo>=<hex>` form.
    pub signature_header: String,
    /// Raw request body bytes.
    pub raw_body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Raw payload shapes (everything optional, validated below)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationRef {
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: Option<u64>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadRef {
    pub sha: Option<String>,
    #[serde(rename = "ref")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: Option<u64>,
    pub head: Option<HeadRef>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunRef {
    pub id: Option<u64>,
    pub head_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawIssuesPayload {
    issue: Option<IssueRef>,
    repository: Option<RepositoryRef>,
    installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPullRequestPayload {
    pull_request: Option<PullRequestRef>,
    repository: Option<RepositoryRef>,
    installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawWorkflowRunPayload {
    workflow_run: Option<WorkflowRunRef>,
    repository: Option<RepositoryRef>,
    installation: Option<InstallationRef>,
}

// ---------------------------------------------------------------------------
// Validated payloads
// ---------------------------------------------------------------------------

/// Validated `issues` event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuesPayload {
    pub issue_number: u64,
    pub issue_body: String,
    pub issue_state: String,
    pub repo_full_name: String,
    pub installation_id: u64,
}

/// Validated `pull_request` event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestPayload {
    pub pr_number: u64,
    pub head_sha: String,
    pub head_ref: String,
    pub body: String,
    pub title: String,
    pub labels: Vec<String>,
    pub repo_full_name: String,
    pub installation_id: u64,
}

/// Validated `workflow_run` event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRunPayload {
    pub run_id: u64,
    pub head_sha: String,
    pub repo_full_name: String,
    pub installation_id: u64,
}

/// An event payload after type-keyed deserialization and validation.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Issues(IssuesPayload),
    PullRequest(PullRequestPayload),
    WorkflowRun(WorkflowRunPayload),
}

fn missing(event_type: &str, field: &str) -> ValidationError {
    ValidationError::MissingPayloadField {
        event_type: event_type.to_string(),
        field: field.to_string(),
    }
}

fn parse_raw<'a, T: Deserialize<'a>>(raw_body: &'a [u8]) -> Result<T, ValidationError> {
    serde_json::from_slice(raw_body).map_err(|e| ValidationError::MalformedPayload(e.to_string()))
}

/// Deserialize and validate an event body against its declared type.
///
/// # Errors
///
/// - `ValidationError::UnsupportedEventType` — type is not one the core handles.
/// - `ValidationError::MalformedPayload` — body is not valid JSON of the
///   expected shape.
/// - `ValidationError::MissingPayloadField` — a required field is absent.
pub fn parse_event_payload(
    event_type: &str,
    raw_body: &[u8],
) -> Result<EventPayload, ValidationError> {
    match event_type {
        "issues" => {
            let raw: RawIssuesPayload = parse_raw(raw_body)?;
            let issue = raw.issue.ok_or_else(|| missing("issues", "issue"))?;
            Ok(EventPayload::Issues(IssuesPayload {
                issue_number: issue
                    .number
                    .ok_or_else(|| missing("issues", "issue.number"))?,
                issue_body: issue.body.unwrap_or_default(),
                issue_state: issue.state.unwrap_or_else(|| "open".to_string()),
                repo_full_name: raw
                    .repository
                    .and_then(|r| r.full_name)
                    .ok_or_else(|| missing("issues", "repository.full_name"))?,
                installation_id: raw
                    .installation
                    .and_then(|i| i.id)
                    .ok_or_else(|| missing("issues", "installation.id"))?,
            }))
        }
        "pull_request" => {
            let raw: RawPullRequestPayload = parse_raw(raw_body)?;
            let pr = raw
                .pull_request
                .ok_or_else(|| missing("pull_request", "pull_request"))?;
            let head = pr
                .head
                .ok_or_else(|| missing("pull_request", "pull_request.head"))?;
            Ok(EventPayload::PullRequest(PullRequestPayload {
                pr_number: pr
                    .number
                    .ok_or_else(|| missing("pull_request", "pull_request.number"))?,
                head_sha: head
                    .sha
                    .ok_or_else(|| missing("pull_request", "pull_request.head.sha"))?,
                head_ref: head.branch.unwrap_or_default(),
                body: pr.body.unwrap_or_default(),
                title: pr.title.unwrap_or_default(),
                labels: pr.labels.into_iter().map(|l| l.name).collect(),
                repo_full_name: raw
                    .repository
                    .and_then(|r| r.full_name)
                    .ok_or_else(|| missing("pull_request", "repository.full_name"))?,
                installation_id: raw
                    .installation
                    .and_then(|i| i.id)
                    .ok_or_else(|| missing("pull_request", "installation.id"))?,
            }))
        }
        "workflow_run" => {
            let raw: RawWorkflowRunPayload = parse_raw(raw_body)?;
            let run = raw
                .workflow_run
                .ok_or_else(|| missing("workflow_run", "workflow_run"))?;
            Ok(EventPayload::WorkflowRun(WorkflowRunPayload {
                run_id: run
                    .id
                    .ok_or_else(|| missing("workflow_run", "workflow_run.id"))?,
                head_sha: run
                    .head_sha
                    .ok_or_else(|| missing("workflow_run", "workflow_run.head_sha"))?,
                repo_full_name: raw
                    .repository
                    .and_then(|r| r.full_name)
                    .ok_or_else(|| missing("workflow_run", "repository.full_name"))?,
                installation_id: raw
                    .installation
                    .and_then(|i| i.id)
                    .ok_or_else(|| missing("workflow_run", "installation.id"))?,
            }))
        }
        other => Err(ValidationError::UnsupportedEventType {
            event_type: other.to_string(),
        }),
    }
}

/// Split an `owner/repo` full name into its two halves.
pub fn split_repo_full_name(full_name: &str) -> Result<(&str, &str), ValidationError> {
    full_name
        .split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .ok_or_else(|| ValidationError::MalformedRepoName {
            full_name: full_name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_issues_payload() {
        let body = serde_json::json!({
            "issue": {"number": 42, "body": "## Acceptance Criteria\n- Must work", "state": "open"},
            "repository": {"full_name": "acme/widgets"},
            "installation": {"id": 991}
        });
        let payload = parse_event_payload("issues", body.to_string().as_bytes()).expect("parse");
        match payload {
            EventPayload::Issues(p) => {
                assert_eq!(p.issue_number, 42);
                assert_eq!(p.repo_full_name, "acme/widgets");
                assert_eq!(p.installation_id, 991);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_missing_installation_is_fatal() {
        let body = serde_json::json!({
            "issue": {"number": 42, "body": ""},
            "repository": {"full_name": "acme/widgets"}
        });
        let err = parse_event_payload("issues", body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingPayloadField { ref field, .. } if field == "installation.id"
        ));
    }

    #[test]
    fn test_missing_head_sha_is_fatal() {
        let body = serde_json::json!({
            "pull_request": {"number": 3, "head": {"ref": "feature/x"}},
            "repository": {"full_name": "acme/widgets"},
            "installation": {"id": 1}
        });
        let err = parse_event_payload("pull_request", body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingPayloadField { ref field, .. }
                if field == "pull_request.head.sha"
        ));
    }

    #[test]
    fn test_workflow_run_payload() {
        let body = serde_json::json!({
            "workflow_run": {"id": 555, "head_sha": "deadbeef"},
            "repository": {"full_name": "acme/widgets"},
            "installation": {"id": 991}
        });
        let payload =
            parse_event_payload("workflow_run", body.to_string().as_bytes()).expect("parse");
        assert!(matches!(
            payload,
            EventPayload::WorkflowRun(ref p) if p.run_id == 555 && p.head_sha == "deadbeef"
        ));
    }

    #[test]
    fn test_unsupported_event_type() {
        let err = parse_event_payload("deployment", b"{}").unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedEventType { .. }));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_event_payload("issues", b"not json").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPayload(_)));
    }

    #[test]
    fn test_split_repo_full_name() {
        assert_eq!(split_repo_full_name("acme/widgets").unwrap(), ("acme", "widgets"));
        assert!(split_repo_full_name("no-slash").is_err());
        assert!(split_repo_full_name("/repo").is_err());
    }
}
