//! Bridge configuration.

use crate::runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use tether_core::error::{BridgeError, Result};
use tether_core::table::TableConfig;

/// Import module the guest's glue imports from.
pub const DEFAULT_IMPORT_MODULE: &str = "wbg";

/// Export run once by [`Bridge::start`](crate::Bridge::start).
pub const DEFAULT_START_EXPORT: &str = "__wbindgen_start";

/// Everything needed to stand up a bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Engine and store limits.
    pub runtime: RuntimeConfig,
    /// Externref table layout.
    pub table: TableConfig,
    /// Module name every host import is registered under.
    pub import_module: String,
    /// Name of the guest's start export.
    pub start_export: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            table: TableConfig::default(),
            import_module: DEFAULT_IMPORT_MODULE.to_string(),
            start_export: DEFAULT_START_EXPORT.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Settings for tests: metered runtime and a small table.
    pub fn testing() -> Self {
        Self {
            runtime: RuntimeConfig::testing(),
            table: TableConfig::testing(),
            ..Self::default()
        }
    }

    /// Replace the runtime settings.
    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Replace the table settings.
    pub fn with_table(mut self, table: TableConfig) -> Self {
        self.table = table;
        self
    }

    /// Register imports under a different module name.
    pub fn with_import_module(mut self, module: impl Into<String>) -> Self {
        self.import_module = module.into();
        self
    }

    /// Use a different start export.
    pub fn with_start_export(mut self, name: impl Into<String>) -> Self {
        self.start_export = name.into();
        self
    }

    /// Reject settings the bridge cannot honour.
    pub fn validate(&self) -> Result<()> {
        self.runtime.validate()?;
        if self.import_module.is_empty() {
            return Err(BridgeError::ConfigValue {
                field: "import_module".into(),
                cause: "must not be empty".into(),
            });
        }
        if self.start_export.is_empty() {
            return Err(BridgeError::ConfigValue {
                field: "start_export".into(),
                cause: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_guest_glue() {
        let config = BridgeConfig::default();
        assert_eq!(config.import_module, "wbg");
        assert_eq!(config.start_export, "__wbindgen_start");
        assert_eq!(config.table.offset, 128);
        config.validate().unwrap();
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = BridgeConfig::testing().with_import_module("").validate().unwrap_err();
        assert_eq!(err.code(), "E901");
    }

    #[test]
    fn round_trips_through_json() {
        let config = BridgeConfig::testing().with_start_export("start");
        let json = serde_json::to_string(&config).unwrap();
        let back: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_export, "start");
        assert_eq!(back.runtime.max_memory_pages, 256);
    }
}
