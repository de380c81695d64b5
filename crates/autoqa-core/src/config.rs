//! Runtime settings loaded from environment variables.
//!
//! Every knob has an `AUTOQA_`-prefixed variable. The app identity and
//! webhook secret are required; everything else has a default. Settings
//! are read once at startup and passed by reference; there is no ambient
//! global.

use crate::domain::{AutoQaError, Result};

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// GitHub App id used as the assertion issuer.
    pub app_id: String,
    /// PEM-encoded RSA private key for the app.
    pub private_key_pem: String,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
    /// Whether the merge gate may merge PRs.
    pub auto_merge_enabled: bool,
    /// Merge method passed to the provider ("squash", "merge", "rebase").
    pub merge_method: String,
    /// Capacity of the processed-delivery cache.
    pub delivery_cache_capacity: usize,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// `AutoQaError::Auth` when a required credential variable is missing,
    /// since nothing can authenticate without it.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_id: require("AUTOQA_GITHUB_APP_ID")?,
            private_key_pem: require("AUTOQA_GITHUB_PRIVATE_KEY")?,
            webhook_secret: require("AUTOQA_WEBHOOK_SECRET")?,
            auto_merge_enabled: flag("AUTOQA_AUTO_MERGE_ENABLED"),
            merge_method: std::env::var("AUTOQA_MERGE_METHOD")
                .unwrap_or_else(|_| "squash".to_string()),
            delivery_cache_capacity: std::env::var("AUTOQA_DELIVERY_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::guard::DEFAULT_DELIVERY_CAPACITY),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| AutoQaError::Auth(format!("missing required environment variable {name}")))
}

fn flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
