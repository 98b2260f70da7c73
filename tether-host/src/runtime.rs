//! Engine configuration, module loading and compilation cache.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tether_core::error::{BridgeError, Result};
use wasmtime::{Config, Engine, Module};

/// Default maximum memory pages (64 KiB per page).
const DEFAULT_MAX_MEMORY_PAGES: u32 = 16_384; // 1 GiB

/// Default fuel amount when fuel metering is on.
const DEFAULT_FUEL: u64 = 100_000_000;

/// Engine and store limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum linear memory pages the guest may grow to.
    pub max_memory_pages: u32,
    /// Meter guest execution with fuel.
    pub fuel_enabled: bool,
    /// Fuel granted per store when metering is on.
    pub fuel_amount: u64,
    /// Enable epoch-based interruption.
    pub epoch_interruption: bool,
    /// Epoch ticks a guest call may run before it is interrupted.
    pub epoch_deadline: u64,
    /// Reuse compiled modules with identical bytes.
    pub cache_modules: bool,
    /// Emit debug info in compiled code.
    pub debug_info: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl RuntimeConfig {
    /// Settings for long-running embedders. Rendering guests run an event
    /// loop indefinitely, so neither fuel nor epochs are on.
    pub fn production() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            fuel_enabled: false,
            fuel_amount: DEFAULT_FUEL,
            epoch_interruption: false,
            epoch_deadline: 1,
            cache_modules: true,
            debug_info: false,
        }
    }

    /// Tighter limits and fuel metering for tests.
    pub fn testing() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_enabled: true,
            fuel_amount: 10_000_000,
            epoch_interruption: false,
            epoch_deadline: 1,
            cache_modules: false,
            debug_info: true,
        }
    }

    /// Set the memory page limit.
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    /// Enable or disable fuel metering.
    pub fn with_fuel(mut self, enabled: bool, amount: u64) -> Self {
        self.fuel_enabled = enabled;
        self.fuel_amount = amount;
        self
    }

    /// Enable epoch interruption with the given deadline in ticks.
    pub fn with_epoch_deadline(mut self, ticks: u64) -> Self {
        self.epoch_interruption = true;
        self.epoch_deadline = ticks;
        self
    }

    /// Enable or disable the module cache.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_modules = enabled;
        self
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_pages == 0 || self.max_memory_pages > 65_536 {
            return Err(BridgeError::ConfigValue {
                field: "max_memory_pages".into(),
                cause: format!("{} is outside 1..=65536", self.max_memory_pages),
            });
        }
        if self.fuel_enabled && self.fuel_amount == 0 {
            return Err(BridgeError::ConfigValue {
                field: "fuel_amount".into(),
                cause: "fuel metering with zero fuel traps immediately".into(),
            });
        }
        Ok(())
    }

    fn to_wasmtime_config(&self) -> Config {
        let mut config = Config::new();
        config.epoch_interruption(self.epoch_interruption);
        config.consume_fuel(self.fuel_enabled);
        config.debug_info(self.debug_info);
        config.strategy(wasmtime::Strategy::Cranelift);
        config
    }

    /// Memory limit in bytes for the store limiter.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * tether_core::memory::WASM_PAGE_SIZE
    }
}

/// Where a guest module comes from.
pub enum ModuleSource {
    /// Module bytes. The engine also accepts the text format.
    Bytes(Vec<u8>),
    /// A file on disk.
    File(PathBuf),
    /// A URL fetched over HTTP.
    #[cfg(feature = "fetch")]
    Url(String),
    /// An already-compiled module.
    Compiled(Module),
}

impl ModuleSource {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(bytes) => format!("{} bytes", bytes.len()),
            Self::File(path) => path.display().to_string(),
            #[cfg(feature = "fetch")]
            Self::Url(url) => url.clone(),
            Self::Compiled(_) => "precompiled module".to_string(),
        }
    }
}

impl From<Vec<u8>> for ModuleSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ModuleSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for ModuleSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ModuleSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Module> for ModuleSource {
    fn from(module: Module) -> Self {
        Self::Compiled(module)
    }
}

/// Engine plus a cache of compiled modules keyed by content hash.
pub struct BridgeRuntime {
    engine: Engine,
    config: RuntimeConfig,
    modules: DashMap<u64, Module>,
}

impl BridgeRuntime {
    /// Create a runtime.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let engine = Engine::new(&config.to_wasmtime_config()).map_err(|e| BridgeError::WasmLoad {
            cause: format!("engine: {e}"),
        })?;
        Ok(Self {
            engine,
            config,
            modules: DashMap::new(),
        })
    }

    /// Create a runtime with production settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(RuntimeConfig::default())
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Compile bytes, consulting the cache first.
    pub fn compile(&self, bytes: &[u8]) -> Result<Module> {
        let hash = hash_bytes(bytes);
        if self.config.cache_modules {
            if let Some(cached) = self.modules.get(&hash) {
                tracing::debug!(hash, "module cache hit");
                return Ok(cached.clone());
            }
        }

        let module = Module::new(&self.engine, bytes).map_err(|e| BridgeError::WasmLoad {
            cause: e.to_string(),
        })?;
        tracing::debug!(hash, size = bytes.len(), "module compiled");

        if self.config.cache_modules {
            self.modules.insert(hash, module.clone());
        }
        Ok(module)
    }

    /// Read and compile a module from disk.
    pub fn compile_file(&self, path: &Path) -> Result<Module> {
        let bytes = std::fs::read(path).map_err(|e| BridgeError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        self.compile(&bytes)
    }

    /// Resolve a source without network access.
    pub fn load_sync(&self, source: ModuleSource) -> Result<Module> {
        match source {
            ModuleSource::Bytes(bytes) => self.compile(&bytes),
            ModuleSource::File(path) => self.compile_file(&path),
            #[cfg(feature = "fetch")]
            ModuleSource::Url(url) => Err(BridgeError::ConfigValue {
                field: "source".into(),
                cause: format!("{url} must be loaded with the async initializer"),
            }),
            ModuleSource::Compiled(module) => Ok(module),
        }
    }

    /// Resolve any source, fetching URLs.
    pub async fn load(&self, source: ModuleSource) -> Result<Module> {
        match source {
            #[cfg(feature = "fetch")]
            ModuleSource::Url(url) => {
                let bytes = fetch_module(&url).await?;
                self.compile(&bytes)
            }
            other => self.load_sync(other),
        }
    }

    /// Check that bytes are a valid module without caching them.
    pub fn validate(&self, bytes: &[u8]) -> Result<()> {
        Module::validate(&self.engine, bytes).map_err(|e| BridgeError::WasmLoad {
            cause: e.to_string(),
        })
    }

    /// Drop every cached module.
    pub fn clear_cache(&self) {
        self.modules.clear();
    }

    /// Number of cached modules.
    pub fn cache_size(&self) -> usize {
        self.modules.len()
    }

    /// Fuel for new stores, if metering is on.
    pub fn initial_fuel(&self) -> Option<u64> {
        self.config.fuel_enabled.then_some(self.config.fuel_amount)
    }
}

#[cfg(feature = "fetch")]
async fn fetch_module(url: &str) -> Result<Vec<u8>> {
    let network = |cause: String| BridgeError::Network {
        url: url.to_string(),
        cause,
    };
    let response = reqwest::get(url).await.map_err(|e| network(e.to_string()))?;
    let response = response.error_for_status().map_err(|e| network(e.to_string()))?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type != "application/wasm" {
        tracing::warn!(
            url,
            content_type,
            "module not served as application/wasm; compiling from the full body"
        );
    }
    let bytes = response.bytes().await.map_err(|e| network(e.to_string()))?;
    Ok(bytes.to_vec())
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "(module (memory (export \"memory\") 1))";

    #[test]
    fn production_is_unmetered() {
        let config = RuntimeConfig::production();
        assert!(!config.fuel_enabled);
        assert!(!config.epoch_interruption);
        assert!(config.cache_modules);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let err = RuntimeConfig::default()
            .with_max_memory_pages(0)
            .validate()
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(BridgeRuntime::new(RuntimeConfig::testing().with_fuel(true, 0)).is_err());
    }

    #[test]
    fn cache_returns_same_module() {
        let runtime = BridgeRuntime::with_defaults().unwrap();
        let bytes = wat::parse_str(EMPTY).unwrap();
        runtime.compile(&bytes).unwrap();
        runtime.compile(&bytes).unwrap();
        assert_eq!(runtime.cache_size(), 1);
        runtime.clear_cache();
        assert_eq!(runtime.cache_size(), 0);
    }

    #[test]
    fn garbage_fails_to_load() {
        let runtime = BridgeRuntime::new(RuntimeConfig::testing()).unwrap();
        assert!(matches!(
            runtime.compile(b"not wasm"),
            Err(BridgeError::WasmLoad { .. })
        ));
        assert!(runtime.validate(b"\0asm").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let runtime = BridgeRuntime::with_defaults().unwrap();
        let err = runtime
            .load_sync(ModuleSource::File("/nonexistent/guest.wasm".into()))
            .unwrap_err();
        assert_eq!(err.code(), "E902");
    }
}
