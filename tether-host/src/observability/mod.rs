//! Log subscriber setup for embedders.
//!
//! The bridge only emits `tracing` events; nothing in it installs a
//! subscriber or reads the environment. Binaries and tests that want output
//! call [`init_tracing`] once.
//!
//! Output format is controlled via `TETHER_LOG_FORMAT`:
//! - `json` - one JSON object per event
//! - `pretty` - multi-line human-readable output
//! - `compact` - single-line output (default)
//!
//! Guest console output is emitted under the [`GUEST_TARGET`] target, so it
//! can be filtered separately, e.g. `TETHER_LOG_LEVEL=info,tether::guest=warn`.
//!
//! # Example
//!
//! ```ignore
//! use tether_host::observability::{TracingConfig, init_tracing};
//!
//! let _guard = init_tracing(TracingConfig::from_env())?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};

/// Target used for events produced by the guest's console calls.
pub const GUEST_TARGET: &str = "tether::guest";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TracingConfig::builder()
            .log_format(LogFormat::Json)
            .log_filter("debug")
            .guest_level("warn")
            .build();
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.filter_directives(), "debug,tether::guest=warn");
    }

    #[test]
    fn default_filter_has_no_guest_override() {
        let config = TracingConfig::default();
        assert_eq!(config.filter_directives(), "info");
        assert!(!config.include_location());
    }

    #[test]
    fn subscriber_installs_once() {
        let config = TracingConfig::builder()
            .log_format(LogFormat::Json)
            .log_filter("not a valid [filter")
            .build();
        let guard = init_tracing(config.clone()).unwrap();
        assert_eq!(guard.format(), LogFormat::Json);
        assert!(init_tracing(config).is_err());
    }

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("fancy".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    }
}
