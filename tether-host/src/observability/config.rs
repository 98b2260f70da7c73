//! Subscriber configuration.

use super::GUEST_TARGET;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        })
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    log_format: LogFormat,
    log_filter: String,
    guest_level: Option<String>,
    include_location: bool,
    include_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
            guest_level: None,
            include_location: false,
            include_target: true,
        }
    }
}

impl TracingConfig {
    /// Start a builder.
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Read configuration from the environment.
    ///
    /// - `TETHER_LOG_FORMAT`: `json`, `pretty` or `compact`
    /// - `TETHER_LOG_LEVEL`, falling back to `RUST_LOG`: filter directives
    /// - `TETHER_GUEST_LOG_LEVEL`: level for guest console output
    /// - `TETHER_LOG_LOCATION`: `1`/`true` to include file and line
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            env::var(name)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };
        let defaults = Self::default();
        Self {
            log_format: env::var("TETHER_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.log_format),
            log_filter: env::var("TETHER_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
            guest_level: env::var("TETHER_GUEST_LOG_LEVEL").ok(),
            include_location: flag("TETHER_LOG_LOCATION"),
            include_target: defaults.include_target,
        }
    }

    /// Output format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Base filter directives.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Full directive string, including the guest console override.
    pub fn filter_directives(&self) -> String {
        match &self.guest_level {
            Some(level) => format!("{},{GUEST_TARGET}={level}", self.log_filter),
            None => self.log_filter.clone(),
        }
    }

    /// Include file and line in events.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    /// Include the event target.
    pub fn include_target(&self) -> bool {
        self.include_target
    }
}

/// Builder for [`TracingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TracingConfigBuilder {
    config: TracingConfig,
}

impl TracingConfigBuilder {
    /// Set the output format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    /// Set the base filter directives.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Set the level for guest console output.
    pub fn guest_level(mut self, level: impl Into<String>) -> Self {
        self.config.guest_level = Some(level.into());
        self
    }

    /// Include file and line.
    pub fn include_location(mut self, include: bool) -> Self {
        self.config.include_location = include;
        self
    }

    /// Include the event target.
    pub fn include_target(mut self, include: bool) -> Self {
        self.config.include_target = include;
        self
    }

    /// Finish.
    pub fn build(self) -> TracingConfig {
        self.config
    }
}
