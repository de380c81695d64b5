//! Domain-level error taxonomy for AutoQA.

/// Errors produced by webhook payload validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported event type: {event_type}")]
    UnsupportedEventType { event_type: String },

    #[error("event type {event_type} missing required payload field: {field}")]
    MissingPayloadField {
        event_type: String,
        field: String,
    },

    #[error("malformed event payload: {0}")]
    MalformedPayload(String),

    #[error("repository full name {full_name} is not in owner/repo form")]
    MalformedRepoName { full_name: String },
}

/// AutoQA domain errors.
///
/// `Upstream` and `RateLimited` carry provider responses verbatim so an
/// operator can see exactly what the hosting provider said. Retry policy
/// lives with the caller, never inside the core.
#[derive(Debug, thiserror::Error)]
pub enum AutoQaError {
    /// Credential mint or exchange failure. Fatal for the current event,
    /// retryable on the next delivery.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Malformed or incomplete event payload. Fatal, not retried.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Hosting-provider API failure.
    #[error("upstream error (status {status}): {detail}")]
    Upstream { status: u16, detail: String },

    /// Provider rate limit hit. Distinguished from `Upstream` so callers
    /// can back off instead of retrying immediately.
    #[error("rate limited by provider: {detail}")]
    RateLimited { detail: String },

    /// Malformed diff or test-report artifact. Fatal for that artifact only.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record store failure, surfaced by whichever backend implements
    /// the persistence capability.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for AutoQA domain operations.
pub type Result<T> = std::result::Result<T, AutoQaError>;
