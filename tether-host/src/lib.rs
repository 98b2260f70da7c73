//! Tether host - wasmtime embedding of the guest/host call bridge.
//!
//! This crate provides:
//! - Engine configuration, module loading and a compiled-module cache
//! - Per-store bridge state and the guest adapter over a live instance
//! - The declarative call marshaller and its import tables for GPU,
//!   texture transcoding, page and language built-ins
//! - Runtime intrinsics for handles, strings, closures and exceptions
//! - The lifecycle controller and cooperative event loop
//! - Log subscriber setup
//! - Mock host objects for tests
//!
//! # Example
//!
//! ```ignore
//! use tether_host::prelude::*;
//!
//! let mut bridge = Bridge::builder()
//!     .config(BridgeConfig::default())
//!     .globals(tether_host::testing::default_globals())
//!     .build()?;
//! bridge.init(ModuleSource::File("app_bg.wasm".into())).await?;
//! bridge.start().await?;
//! bridge.tick_frame(16.0).await?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod guest;
pub mod intrinsics;
pub mod lifecycle;
pub mod marshal;
pub mod observability;
pub mod runtime;
pub mod state;
pub mod testing;
pub mod thunks;

pub use config::BridgeConfig;
pub use lifecycle::{Bridge, BridgeBuilder, LoopStats};
pub use runtime::{BridgeRuntime, ModuleSource, RuntimeConfig};
pub use state::BridgeState;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{BridgeConfig, DEFAULT_IMPORT_MODULE, DEFAULT_START_EXPORT};
    pub use crate::lifecycle::{Bridge, BridgeBuilder, LoopStats};
    pub use crate::marshal::{Op, Param, Ret, Thunk};
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::runtime::{BridgeRuntime, ModuleSource, RuntimeConfig};
    pub use crate::state::{BridgeState, GuestExports};
    pub use tether_core::prelude::*;
}
