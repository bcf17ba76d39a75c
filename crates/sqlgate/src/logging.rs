//! Diagnostic logging to stderr; stdout is reserved for JSON envelopes.
//!
//! - `SQLGATE_LOG`: filter directives, falling back to `RUST_LOG`, then `warn`
//! - `SQLGATE_LOG_FORMAT`: `pretty`, `compact` (default) or `json`

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const FILTER_ENV: &str = "SQLGATE_LOG";
pub const FORMAT_ENV: &str = "SQLGATE_LOG_FORMAT";
const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to `Compact`.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("json") => Self::Json,
            _ => Self::Compact,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var(FORMAT_ENV).ok().as_deref())
    }
}

/// First non-blank directive among `SQLGATE_LOG` and `RUST_LOG`.
#[must_use]
pub fn filter_directives(sqlgate_log: Option<String>, rust_log: Option<String>) -> String {
    [sqlgate_log, rust_log]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

pub fn init() -> Result<()> {
    let directives = filter_directives(
        std::env::var(FILTER_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&directives)
        .map_err(|error| anyhow!("invalid {FILTER_ENV} directives `{directives}`: {error}"))?;
    let format = LogFormat::from_env();

    let registry = tracing_subscriber::registry().with(filter);
    let initialized = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    initialized.map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))?;

    tracing::debug!(?format, %directives, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, filter_directives};

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" Pretty ")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some("compact")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(Some("xml")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(None), LogFormat::Compact);
    }

    #[test]
    fn own_filter_wins_over_rust_log() {
        assert_eq!(
            filter_directives(Some("sqlgate=debug".into()), Some("info".into())),
            "sqlgate=debug"
        );
        assert_eq!(filter_directives(Some("  ".into()), Some("info".into())), "info");
        assert_eq!(filter_directives(None, None), "warn");
    }
}
