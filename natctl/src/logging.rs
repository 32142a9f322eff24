use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Build the level filter: a parseable `RUST_LOG` wins over the configured level.
///
/// An unparseable `RUST_LOG` is reported on stderr (no subscriber exists yet)
/// and ignored.
pub fn env_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter> {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return Ok(filter),
            Err(e) => eprintln!(
                "Ignoring invalid {}={directives:?}: {e}",
                EnvFilter::DEFAULT_ENV
            ),
        }
    }
    EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}"))
}

/// Initialize logging to stderr. Must be called exactly once at startup.
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let registry =
        tracing_subscriber::registry().with(env_filter(level, rust_log.as_deref())?);

    let result = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_level(true)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .flatten_event(true)
                    .with_ansi(false),
            )
            .try_init(),
    };
    result.context("Failed to set tracing subscriber")
}
