//! Subscriber installation.

use super::{LogFormat, TracingConfig};
use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps logging configured for as long as it lives.
#[must_use = "dropping the guard immediately is allowed but usually unintended"]
pub struct TracingGuard {
    format: LogFormat,
}

impl TracingGuard {
    /// The format that was installed.
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

/// Install a global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    let directives = config.filter_directives();
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("invalid log filter {directives:?} ({e}); falling back to info");
        EnvFilter::new("info")
    });

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer()
        .with_file(config.include_location())
        .with_line_number(config.include_location())
        .with_target(config.include_target());

    match config.log_format() {
        LogFormat::Json => registry.with(layer.json().flatten_event(true)).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
    }
    .context("failed to install tracing subscriber")?;

    Ok(TracingGuard {
        format: config.log_format(),
    })
}
