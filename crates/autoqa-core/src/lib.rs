//! AutoQA Core Library
//!
//! Event-driven correlation of issue acceptance criteria, pull request
//! changes, and CI test reports into a compliance verdict that gates
//! auto-merge. Provider integrations implement the capability traits;
//! everything here is provider-agnostic.

pub mod broker;
pub mod capability;
pub mod comment;
pub mod config;
pub mod correlate;
pub mod diff;
pub mod domain;
pub mod extract;
pub mod fakes;
pub mod gate;
pub mod guard;
pub mod junit;
pub mod obs;
pub mod router;
pub mod telemetry;

pub use broker::CredentialBroker;

pub use capability::{
    ArtifactMeta, CredentialExchange, CriteriaSuggester, InstallationToken, MergeAck, RecordStore,
    RepositoryClient,
};

pub use comment::{render_checklist_comment, render_report_comment};

pub use config::Settings;

pub use correlate::{map_results_to_checklist, CorrelatedResult};

pub use diff::{extract_changed_symbols, generate_test_manifest, Language};

pub use domain::{
    parse_event_payload, split_repo_full_name, AutoQaError, ChecklistItem, ComplianceVerdict,
    EventPayload, IssueRecord, IssuesPayload, NormalizedTestResult, PersistedTestResult, PrRecord,
    PullRequestPayload, Result, SymbolChange, SymbolKind, TestManifest, TestManifestEntry,
    TestStatus, ValidationError, ValidationStatus, WebhookEvent, WorkflowRunPayload,
};

pub use extract::{extract_acceptance_criteria, find_linked_issue, merge_checklist};

pub use gate::{MergeGate, MergeOutcome, MergeTarget};

pub use guard::{verify_signature, DeliveryCache};

pub use junit::{parse_junit, parse_junit_artifact};

pub use obs::{
    delivery_span, emit_checklist_generated, emit_event_duplicate, emit_event_received,
    emit_manifest_generated, emit_merge_outcome, emit_verdict_computed,
};

pub use router::{EventDisposition, EventRouter};

pub use telemetry::{init_tracing, init_tracing_from_env, LogFormat};

/// AutoQA version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
