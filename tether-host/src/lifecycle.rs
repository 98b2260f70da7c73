//! Bridge lifecycle: load, instantiate, start and drive the event loop.
//!
//! A [`Bridge`] owns one wasmtime store. Initialisation is idempotent: the
//! first successful `init` or `init_sync` instantiates the guest and every
//! later call returns the same instance. `start` runs the guest's start
//! export at most once.
//!
//! The event loop is cooperative. Host operations that finish later queue
//! promise reactions or settle futures; [`Bridge::run_until_idle`] runs the
//! queued work against the guest, drains closure finalizers, and awaits
//! host futures until nothing is left.

use crate::config::BridgeConfig;
use crate::guest::{GuestCx, trap_error};
use crate::intrinsics::register_intrinsics;
use crate::runtime::{BridgeRuntime, ModuleSource};
use crate::state::{BridgeState, GuestExports};
use crate::thunks::register_all;
use futures::future::join_all;
use std::sync::Arc;
use tether_core::error::{BridgeError, Result};
use tether_core::tasks::run_job;
use tether_core::value::{HostDict, HostValue};
use wasmtime::{AsContextMut, Instance, Linker, Module, Store, WasmParams, WasmResults};

/// What one pass of the event loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Microtasks and promise reactions run.
    pub jobs: usize,
    /// Host futures awaited and settled.
    pub futures: usize,
    /// Closure destructors called from the finalizer queue.
    pub finalized: usize,
    /// Rejections nobody handled.
    pub unhandled: usize,
}

impl LoopStats {
    fn absorb(&mut self, other: LoopStats) {
        self.jobs += other.jobs;
        self.futures += other.futures;
        self.finalized += other.finalized;
        self.unhandled += other.unhandled;
    }
}

/// Builder for [`Bridge`].
#[derive(Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
    globals: Option<HostDict>,
    runtime: Option<Arc<BridgeRuntime>>,
}

impl BridgeBuilder {
    /// Use this configuration.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this global object.
    pub fn globals(mut self, globals: HostDict) -> Self {
        self.globals = Some(globals);
        self
    }

    /// Share a runtime, and its module cache, with other bridges.
    pub fn runtime(mut self, runtime: Arc<BridgeRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the bridge. Nothing is instantiated yet.
    pub fn build(self) -> Result<Bridge> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Arc::new(BridgeRuntime::new(self.config.runtime.clone())?),
        };

        let mut linker = Linker::new(runtime.engine());
        register_all(&mut linker, &self.config.import_module)?;
        register_intrinsics(&mut linker, &self.config.import_module)?;

        let state = BridgeState::new(&self.config, self.globals.unwrap_or_default())?;
        let mut store = Store::new(runtime.engine(), state);
        store.limiter(|state| &mut state.limits);

        tracing::debug!(
            import_module = %self.config.import_module,
            table_offset = self.config.table.offset,
            "bridge created"
        );
        Ok(Bridge {
            runtime,
            config: self.config,
            linker,
            store,
            instance: None,
            started: false,
        })
    }
}

/// One guest instance and the host state around it.
pub struct Bridge {
    runtime: Arc<BridgeRuntime>,
    config: BridgeConfig,
    linker: Linker<BridgeState>,
    store: Store<BridgeState>,
    instance: Option<Instance>,
    started: bool,
}

impl Bridge {
    /// Start building a bridge.
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    /// Bridge with `config` and an empty global object.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Instantiate from a source that needs no network access.
    pub fn init_sync(&mut self, source: impl Into<ModuleSource>) -> Result<Instance> {
        if let Some(instance) = self.instance {
            tracing::debug!("bridge already initialised");
            return Ok(instance);
        }
        let source = source.into();
        tracing::info!(source = %source.describe(), "initialising bridge");
        let module = self.runtime.load_sync(source)?;
        self.instantiate(&module)
    }

    /// Instantiate from any source, fetching URLs.
    pub async fn init(&mut self, source: impl Into<ModuleSource>) -> Result<Instance> {
        if let Some(instance) = self.instance {
            tracing::debug!("bridge already initialised");
            return Ok(instance);
        }
        let source = source.into();
        tracing::info!(source = %source.describe(), "initialising bridge");
        let module = self.runtime.load(source).await?;
        self.instantiate(&module)
    }

    fn instantiate(&mut self, module: &Module) -> Result<Instance> {
        self.refuel()?;
        let instance = self
            .linker
            .instantiate(&mut self.store, module)
            .map_err(|e| BridgeError::WasmLoad {
                cause: format!("instantiate: {e:#}"),
            })?;
        let exports = GuestExports::resolve(&mut self.store, &instance, &self.config)?;

        let state = self.store.data_mut();
        state.exports = Some(exports);
        state.views.invalidate_all();
        self.instance = Some(instance);
        tracing::info!("bridge initialised");
        Ok(instance)
    }

    /// Run the guest's start export once, then drive the loop until idle.
    ///
    /// A guest without a start export just runs the loop. Repeat calls do
    /// nothing.
    pub async fn start(&mut self) -> Result<LoopStats> {
        let exports = self.exports("start")?;
        if self.started {
            tracing::debug!("bridge already started");
            return Ok(LoopStats::default());
        }
        self.started = true;

        if let Some(start) = exports.start {
            self.refuel()?;
            tracing::debug!(export = %self.config.start_export, "running start export");
            start
                .call(&mut self.store, ())
                .map_err(|e| trap_error(&self.config.start_export, e))?;
        }
        self.run_until_idle().await
    }

    /// Run queued jobs and finalizers without awaiting host futures.
    pub fn pump(&mut self) -> Result<LoopStats> {
        self.exports("pump")?;
        self.refuel()?;
        let tasks = self.store.data().tasks.clone();
        let finalizers = self.store.data().finalizers.clone();
        let mut stats = LoopStats::default();

        let mut guest = GuestCx::new(self.store.as_context_mut(), "pump")?;
        while let Some(job) = tasks.pop() {
            run_job(job, &mut guest)?;
            stats.jobs += 1;
        }
        stats.finalized = finalizers.drain(&mut guest)?;

        for promise in tasks.take_unhandled() {
            let reason = promise
                .outcome()
                .map(|s| s.value().debug_string())
                .unwrap_or_default();
            tracing::warn!(promise = promise.id(), %reason, "unhandled promise rejection");
            stats.unhandled += 1;
        }
        Ok(stats)
    }

    /// Alternate between running jobs and awaiting host futures until
    /// neither is left.
    pub async fn run_until_idle(&mut self) -> Result<LoopStats> {
        let mut total = LoopStats::default();
        loop {
            total.absorb(self.pump()?);
            let tasks = self.store.data().tasks.clone();
            let pending = tasks.take_futures();
            if pending.is_empty() {
                if tasks.is_idle() {
                    break;
                }
                continue;
            }
            total.futures += pending.len();
            let settled = join_all(
                pending
                    .into_iter()
                    .map(|(promise, future)| async move { (promise, future.await) }),
            )
            .await;
            for (promise, outcome) in settled {
                promise.settle(outcome.into());
            }
        }
        tracing::trace!(?total, "event loop idle");
        Ok(total)
    }

    /// Deliver an animation frame, then run until idle.
    pub async fn tick_frame(&mut self, timestamp: f64) -> Result<LoopStats> {
        let scheduled = self.store.data().tasks.schedule_frame(timestamp);
        tracing::trace!(timestamp, scheduled, "animation frame");
        self.run_until_idle().await
    }

    /// Call a guest export directly.
    pub fn call<Params, Results>(&mut self, name: &str, params: Params) -> Result<Results>
    where
        Params: WasmParams,
        Results: WasmResults,
    {
        let instance = self.instance.ok_or_else(|| BridgeError::NotInitialized {
            operation: name.to_string(),
        })?;
        let func = instance
            .get_typed_func::<Params, Results>(&mut self.store, name)
            .map_err(|e| BridgeError::MissingExport {
                name: name.to_string(),
                cause: e.to_string(),
            })?;
        self.refuel()?;
        func.call(&mut self.store, params).map_err(|e| trap_error(name, e))
    }

    /// Put a value in the externref table and return its handle.
    pub fn intern(&mut self, value: HostValue) -> Result<u32> {
        self.store.data_mut().table.intern(value)
    }

    /// Resolve a handle.
    pub fn value(&self, handle: u32) -> Result<HostValue> {
        self.store.data().table.get(handle).cloned()
    }

    /// Bridge state.
    pub fn state(&self) -> &BridgeState {
        self.store.data()
    }

    /// The store, for embedders that call exports themselves.
    pub fn store_mut(&mut self) -> &mut Store<BridgeState> {
        &mut self.store
    }

    /// The instance, once initialised.
    pub fn instance(&self) -> Option<Instance> {
        self.instance
    }

    /// The runtime.
    pub fn runtime(&self) -> &Arc<BridgeRuntime> {
        &self.runtime
    }

    /// The configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    /// Whether `start` has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    fn exports(&self, operation: &str) -> Result<GuestExports> {
        self.store
            .data()
            .exports
            .clone()
            .ok_or_else(|| BridgeError::NotInitialized {
                operation: operation.to_string(),
            })
    }

    /// Grant a fresh fuel budget and epoch deadline for the next guest turn.
    fn refuel(&mut self) -> Result<()> {
        if let Some(fuel) = self.runtime.initial_fuel() {
            self.store.set_fuel(fuel).map_err(|e| BridgeError::ConfigValue {
                field: "fuel_amount".into(),
                cause: e.to_string(),
            })?;
        }
        if self.runtime.config().epoch_interruption {
            self.store.set_epoch_deadline(self.runtime.config().epoch_deadline);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_before_init_fail() {
        let mut bridge = Bridge::new(BridgeConfig::testing()).unwrap();
        assert!(!bridge.is_initialized());
        let err = bridge.pump().unwrap_err();
        assert!(matches!(err, BridgeError::NotInitialized { .. }));
        let err = bridge.call::<(), ()>("main", ()).unwrap_err();
        assert!(matches!(err, BridgeError::NotInitialized { .. }));
    }

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let result = Bridge::builder()
            .config(BridgeConfig::testing().with_import_module(""))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn stats_accumulate() {
        let mut total = LoopStats::default();
        total.absorb(LoopStats {
            jobs: 2,
            futures: 1,
            finalized: 0,
            unhandled: 1,
        });
        total.absorb(LoopStats {
            jobs: 1,
            ..LoopStats::default()
        });
        assert_eq!(total.jobs, 3);
        assert_eq!(total.unhandled, 1);
    }
}
