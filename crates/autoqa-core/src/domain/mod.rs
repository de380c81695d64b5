//! Domain types for the AutoQA correlation pipeline.

pub mod checklist;
pub mod error;
pub mod event;
pub mod manifest;
pub mod record;
pub mod report;

pub use checklist::ChecklistItem;
pub use error::{AutoQaError, Result, ValidationError};
pub use event::{
    parse_event_payload, split_repo_full_name, EventPayload, IssuesPayload, PullRequestPayload,
    WebhookEvent, WorkflowRunPayload,
};
pub use manifest::{SymbolChange, SymbolKind, TestManifest, TestManifestEntry};
pub use record::{IssueRecord, PrRecord, ValidationStatus};
pub use report::{
    ComplianceVerdict, NormalizedTestResult, PersistedTestResult, TestStatus,
};
