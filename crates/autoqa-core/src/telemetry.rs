//! Tracing initialisation for AutoQA processes.
//!
//! The filter comes from the `AUTOQA_LOG` environment variable (standard
//! `EnvFilter` directives), defaulting to `info`. The output format comes
//! from `AUTOQA_LOG_FORMAT`: `json` for newline-delimited JSON lines,
//! anything else for human-readable output.
//!
//! Safe to call more than once — the global subscriber can only be set
//! once per process, so later calls are silently ignored.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding `EnvFilter` directives.
pub const FILTER_ENV: &str = "AUTOQA_LOG";

/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "AUTOQA_LOG_FORMAT";

/// Log line format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines for terminals.
    #[default]
    Text,
    /// Newline-delimited JSON for log aggregation pipelines.
    Json,
}

impl LogFormat {
    /// Resolve the format from `AUTOQA_LOG_FORMAT`. Unset or unrecognised
    /// values fall back to [`LogFormat::Text`].
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(FORMAT_ENV).ok().as_deref())
    }

    fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Initialise the global tracing subscriber.
///
/// Filter directives are read from `AUTOQA_LOG`; when unset, `level`
/// is the default verbosity. Only the first call in a process takes
/// effect.
pub fn init_tracing(format: LogFormat, level: Level) {
    let env_filter =
        EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().with_target(false).json())
                .try_init()
                .ok();
        }
        LogFormat::Text => {
            registry
                .with(fmt::layer().with_target(false))
                .try_init()
                .ok();
        }
    }
}

/// Initialise tracing entirely from the environment, at `info` default
/// verbosity.
pub fn init_tracing_from_env() {
    init_tracing(LogFormat::from_env(), Level::INFO);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_setting_selects_json() {
        assert_eq!(LogFormat::from_setting(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_setting(Some("JSON")), LogFormat::Json);
    }

    #[test]
    fn test_unset_or_unknown_setting_is_text() {
        assert_eq!(LogFormat::from_setting(None), LogFormat::Text);
        assert_eq!(LogFormat::from_setting(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::from_setting(Some("")), LogFormat::Text);
    }
}
