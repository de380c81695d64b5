//! Event router: authenticated ingestion and dispatch to the three
//! correlation pipelines.
//!
//! Control flow per delivery: signature check, then deduplication, then
//! payload parsing, then the pipeline for the event type. The signature
//! check runs first so an invalid signature can never touch the dedup
//! cache or the payload parser.
//!
//! Every pipeline recomputes its output from scratch; redelivery of the
//! same event is safe. Best-effort side effects (posting comments,
//! criteria suggestions) are fire-and-log and never fail the pipeline.

use std::sync::Arc;

use tracing::{info, warn, Instrument};

use crate::capability::{CriteriaSuggester, RecordStore, RepositoryClient};
use crate::comment::{render_checklist_comment, render_report_comment};
use crate::correlate::map_results_to_checklist;
use crate::diff::generate_test_manifest;
use crate::domain::{
    parse_event_payload, split_repo_full_name, AutoQaError, ComplianceVerdict, EventPayload,
    IssueRecord, IssuesPayload, NormalizedTestResult, PersistedTestResult, PrRecord,
    PullRequestPayload, Result, ValidationStatus, WebhookEvent, WorkflowRunPayload,
};
use crate::extract::{extract_acceptance_criteria, find_linked_issue, merge_checklist};
use crate::gate::{MergeGate, MergeOutcome, MergeTarget};
use crate::guard::{verify_signature, DeliveryCache};
use crate::junit::parse_junit_artifact;
use crate::obs;

/// Artifact names considered test reports.
const REPORT_ARTIFACT_MARKERS: &[&str] = &["autoqa", "test-report"];

/// What the router did with a delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDisposition {
    /// Delivery id was already processed.
    Duplicate,
    /// Event type/action combination the router does not handle, or an
    /// event that cannot be correlated yet.
    Ignored { reason: String },
    /// Issue checklist generated and persisted.
    IssueProcessed { checklist_len: usize },
    /// Test manifest generated and persisted.
    PrProcessed { manifest_entries: usize },
    /// Workflow run correlated into a verdict and gated.
    RunProcessed {
        verdict: ComplianceVerdict,
        outcome: MergeOutcome,
    },
}

/// Routes verified webhook deliveries into the correlation pipelines.
///
/// Constructed once with its collaborators and shared by reference;
/// the delivery cache and everything behind the trait objects is safe
/// for concurrent use.
pub struct EventRouter {
    webhook_secret: String,
    deliveries: DeliveryCache,
    store: Arc<dyn RecordStore>,
    repo_client: Arc<dyn RepositoryClient>,
    suggester: Option<Arc<dyn CriteriaSuggester>>,
    gate: MergeGate,
}

impl EventRouter {
    pub fn new(
        webhook_secret: impl Into<String>,
        deliveries: DeliveryCache,
        store: Arc<dyn RecordStore>,
        repo_client: Arc<dyn RepositoryClient>,
        suggester: Option<Arc<dyn CriteriaSuggester>>,
        gate: MergeGate,
    ) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            deliveries,
            store,
            repo_client,
            suggester,
            gate,
        }
    }

    /// Verify, deduplicate, parse, and dispatch one delivery.
    ///
    /// # Errors
    ///
    /// - `AutoQaError::Auth` — signature verification failed; the delivery
    ///   was rejected before any other processing.
    /// - `AutoQaError::Validation` — payload missing required fields.
    /// - Storage errors from the record store.
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<EventDisposition> {
        if !verify_signature(&self.webhook_secret, &event.signature_header, &event.raw_body) {
            return Err(AutoQaError::Auth(
                "webhook signature verification failed".to_string(),
            ));
        }

        self.dispatch(event)
            .instrument(obs::delivery_span(&event.delivery_id))
            .await
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<EventDisposition> {
        if self.deliveries.is_duplicate(&event.delivery_id) {
            obs::emit_event_duplicate(&event.delivery_id);
            return Ok(EventDisposition::Duplicate);
        }
        obs::emit_event_received(&event.event_type, &event.action, &event.delivery_id);

        let handled = matches!(
            (event.event_type.as_str(), event.action.as_str()),
            ("issues", "opened" | "edited")
                | ("pull_request", "opened" | "synchronize")
                | ("workflow_run", "completed")
        );
        if !handled {
            info!(
                event = "delivery.ignored",
                event_type = %event.event_type,
                action = %event.action,
            );
            return Ok(EventDisposition::Ignored {
                reason: format!("unhandled event {}.{}", event.event_type, event.action),
            });
        }

        match parse_event_payload(&event.event_type, &event.raw_body)? {
            EventPayload::Issues(payload) => self.handle_issue(payload).await,
            EventPayload::PullRequest(payload) => self.handle_pull_request(payload).await,
            EventPayload::WorkflowRun(payload) => self.handle_workflow_run(payload).await,
        }
    }

    // -----------------------------------------------------------------------
    // Issue pipeline
    // -----------------------------------------------------------------------

    async fn handle_issue(&self, payload: IssuesPayload) -> Result<EventDisposition> {
        let (owner, repo) = split_repo_full_name(&payload.repo_full_name)?;

        let criteria = extract_acceptance_criteria(&payload.issue_body);

        // Suggestion failures never block heuristic extraction.
        let suggested = match &self.suggester {
            Some(suggester) => match suggester.suggest(&payload.issue_body).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        event = "checklist.suggestion_failed",
                        issue_number = payload.issue_number,
                        error = %e,
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let checklist = merge_checklist(&criteria, suggested);
        obs::emit_checklist_generated(
            &payload.repo_full_name,
            payload.issue_number,
            checklist.len(),
        );

        let record = IssueRecord {
            repo: payload.repo_full_name.clone(),
            issue_number: payload.issue_number,
            checklist: checklist.clone(),
            status: payload.issue_state.clone(),
            updated_at: chrono::Utc::now(),
        };
        self.store.save_issue(record).await?;

        self.post_comment_best_effort(
            payload.installation_id,
            owner,
            repo,
            payload.issue_number,
            &render_checklist_comment(&checklist),
        )
        .await;

        Ok(EventDisposition::IssueProcessed {
            checklist_len: checklist.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Pull request pipeline
    // -----------------------------------------------------------------------

    async fn handle_pull_request(&self, payload: PullRequestPayload) -> Result<EventDisposition> {
        let (owner, repo) = split_repo_full_name(&payload.repo_full_name)?;

        let issue_number = find_linked_issue(&payload.body, &payload.labels, &payload.head_ref, &[]);
        let checklist = match issue_number {
            Some(n) => self
                .store
                .get_issue(&payload.repo_full_name, n)
                .await?
                .map(|issue| issue.checklist)
                .unwrap_or_default(),
            None => Vec::new(),
        };

        // Provider failures degrade to an empty diff rather than failing
        // the synchronization; the generic-entry fallback still applies.
        let (diff, files) = match self
            .fetch_pr_diff_and_files(payload.installation_id, owner, repo, payload.pr_number)
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(
                    event = "manifest.diff_fetch_failed",
                    pr_number = payload.pr_number,
                    error = %e,
                );
                (String::new(), Vec::new())
            }
        };

        let manifest = generate_test_manifest(
            payload.pr_number,
            &payload.head_sha,
            &diff,
            &files,
            &checklist,
        );
        let entry_count = manifest.entries.len();
        obs::emit_manifest_generated(&payload.repo_full_name, payload.pr_number, entry_count);

        let record = PrRecord {
            repo: payload.repo_full_name.clone(),
            pr_number: payload.pr_number,
            issue_number,
            head_sha: payload.head_sha.clone(),
            manifest: Some(manifest),
            validation_status: ValidationStatus::Pending,
            updated_at: chrono::Utc::now(),
        };
        self.store.save_pr(record).await?;

        Ok(EventDisposition::PrProcessed {
            manifest_entries: entry_count,
        })
    }

    async fn fetch_pr_diff_and_files(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<(String, Vec<String>)> {
        let diff = self
            .repo_client
            .get_pr_diff(installation_id, owner, repo, pr_number)
            .await?;
        let files = self
            .repo_client
            .list_pr_files(installation_id, owner, repo, pr_number)
            .await?;
        Ok((diff, files))
    }

    // -----------------------------------------------------------------------
    // Workflow run pipeline
    // -----------------------------------------------------------------------

    async fn handle_workflow_run(&self, payload: WorkflowRunPayload) -> Result<EventDisposition> {
        let (owner, repo) = split_repo_full_name(&payload.repo_full_name)?;

        let Some(pr) = self
            .store
            .find_pr_by_head_sha(&payload.repo_full_name, &payload.head_sha)
            .await?
        else {
            warn!(
                event = "correlate.no_pr_for_sha",
                repo = %payload.repo_full_name,
                head_sha = %payload.head_sha,
            );
            return Ok(EventDisposition::Ignored {
                reason: format!("no PR recorded for head sha {}", payload.head_sha),
            });
        };

        let checklist = match pr.issue_number {
            Some(n) => self
                .store
                .get_issue(&payload.repo_full_name, n)
                .await?
                .map(|issue| issue.checklist)
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let results = self
            .download_test_results(payload.installation_id, owner, repo, payload.run_id)
            .await?;

        // A PR synchronization that has not landed yet leaves the manifest
        // absent; correlation degrades to fuzzy-only matching.
        let (correlated, verdict) =
            map_results_to_checklist(&checklist, pr.manifest.as_ref(), &results);
        obs::emit_verdict_computed(&payload.repo_full_name, pr.pr_number, &verdict);

        let persisted: Vec<PersistedTestResult> = correlated
            .into_iter()
            .map(|c| PersistedTestResult {
                pr_number: pr.pr_number,
                repo: payload.repo_full_name.clone(),
                test_id: c.test_id,
                name: c.name,
                status: c.status,
                checklist_ids: c.checklist_ids,
            })
            .collect();
        self.store.save_test_results(persisted).await?;
        self.store
            .save_verdict(&payload.repo_full_name, pr.pr_number, verdict.clone())
            .await?;

        let mut evaluated = pr.clone();
        evaluated.validation_status = ValidationStatus::Evaluated;
        evaluated.updated_at = chrono::Utc::now();
        self.store.save_pr(evaluated).await?;

        let outcome = self
            .gate
            .attempt(
                self.repo_client.as_ref(),
                MergeTarget {
                    installation_id: payload.installation_id,
                    owner,
                    repo,
                    pr_number: pr.pr_number,
                    base_branch: "main",
                },
                &verdict,
            )
            .await;
        obs::emit_merge_outcome(&payload.repo_full_name, pr.pr_number, &outcome);

        self.post_comment_best_effort(
            payload.installation_id,
            owner,
            repo,
            pr.pr_number,
            &render_report_comment(&verdict, &outcome),
        )
        .await;

        Ok(EventDisposition::RunProcessed { verdict, outcome })
    }

    /// Download and parse every test-report artifact for a run.
    ///
    /// A malformed report aborts that artifact only; the run continues
    /// with whatever parsed cleanly.
    async fn download_test_results(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<NormalizedTestResult>> {
        let artifacts = self
            .repo_client
            .list_artifacts(installation_id, owner, repo, run_id)
            .await?;

        let mut results = Vec::new();
        for artifact in artifacts {
            let name = artifact.name.to_lowercase();
            if !REPORT_ARTIFACT_MARKERS.iter().any(|m| name.contains(m)) {
                continue;
            }
            let bytes = match self
                .repo_client
                .download_artifact(installation_id, owner, repo, artifact.id)
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        event = "correlate.artifact_download_failed",
                        artifact = %artifact.name,
                        error = %e,
                    );
                    continue;
                }
            };
            match parse_junit_artifact(&bytes) {
                Ok(parsed) => results.extend(parsed),
                Err(e) => {
                    warn!(
                        event = "correlate.artifact_parse_failed",
                        artifact = %artifact.name,
                        error = %e,
                    );
                }
            }
        }
        Ok(results)
    }

    /// Fire-and-log comment posting; failures are visible in logs only.
    async fn post_comment_best_effort(
        &self,
        installation_id: u64,
        owner: &str,
        repo: &str,
        subject_number: u64,
        body: &str,
    ) {
        if let Err(e) = self
            .repo_client
            .post_comment(installation_id, owner, repo, subject_number, body)
            .await
        {
            warn!(
                event = "comment.post_failed",
                subject_number,
                error = %e,
            );
        }
    }
}
