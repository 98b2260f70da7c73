//! Per-store bridge state and resolved guest exports.

use crate::config::BridgeConfig;
use tether_core::closure::FinalizerQueue;
use tether_core::error::{BridgeError, Result};
use tether_core::exception::ExceptionSlot;
use tether_core::memory::ViewCache;
use tether_core::table::ExternrefTable;
use tether_core::tasks::{HostCx, TaskQueue};
use tether_core::value::{HostDict, HostValue};
use wasmtime::{AsContextMut, Instance, Memory, StoreLimits, StoreLimitsBuilder, Table, TypedFunc};

/// Names tried, in order, for the guest's function table.
const FUNCTION_TABLE_EXPORTS: &[&str] = &["__indirect_function_table", "__wbindgen_export_table"];

/// Guest exports the bridge calls into.
#[derive(Clone)]
pub struct GuestExports {
    /// Linear memory.
    pub memory: Memory,
    /// `__wbindgen_malloc(size, align) -> ptr`.
    pub malloc: TypedFunc<(u32, u32), u32>,
    /// `__wbindgen_realloc(ptr, old, new, align) -> ptr`, if exported.
    pub realloc: Option<TypedFunc<(u32, u32, u32, u32), u32>>,
    /// `__wbindgen_free(ptr, size, align)`.
    pub free: TypedFunc<(u32, u32, u32), ()>,
    /// Function table holding closure trampolines and destructors.
    pub table: Option<Table>,
    /// `__wbindgen_exn_store(handle)`, if exported.
    pub exn_store: Option<TypedFunc<u32, ()>>,
    /// The start export, if present.
    pub start: Option<TypedFunc<(), ()>>,
}

impl GuestExports {
    /// Look up and type-check every export.
    pub fn resolve(
        mut store: impl AsContextMut,
        instance: &Instance,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let mut store = store.as_context_mut();
        let missing = |name: &str, cause: String| BridgeError::MissingExport {
            name: name.to_string(),
            cause,
        };

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| missing("memory", "not exported".into()))?;
        let malloc = instance
            .get_typed_func(&mut store, "__wbindgen_malloc")
            .map_err(|e| missing("__wbindgen_malloc", e.to_string()))?;
        let free = instance
            .get_typed_func(&mut store, "__wbindgen_free")
            .map_err(|e| missing("__wbindgen_free", e.to_string()))?;

        let realloc = optional(
            instance.get_func(&mut store, "__wbindgen_realloc"),
            &mut store,
            "__wbindgen_realloc",
        )?;
        let exn_store = optional(
            instance.get_func(&mut store, "__wbindgen_exn_store"),
            &mut store,
            "__wbindgen_exn_store",
        )?;
        let start = optional(
            instance.get_func(&mut store, &config.start_export),
            &mut store,
            &config.start_export,
        )?;

        let table = FUNCTION_TABLE_EXPORTS
            .iter()
            .find_map(|name| instance.get_table(&mut store, name));
        if table.is_none() {
            tracing::warn!("guest exports no function table; closures cannot be invoked");
        }
        if realloc.is_none() {
            tracing::debug!("guest exports no realloc; strings use the exact-size encoder");
        }

        Ok(Self {
            memory,
            malloc,
            realloc,
            free,
            table,
            exn_store,
            start,
        })
    }
}

fn optional<P, R>(
    func: Option<wasmtime::Func>,
    store: impl AsContextMut,
    name: &str,
) -> Result<Option<TypedFunc<P, R>>>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    func.map(|f| f.typed(&store))
        .transpose()
        .map_err(|e| BridgeError::MissingExport {
            name: name.to_string(),
            cause: format!("wrong signature: {e}"),
        })
}

/// Everything the host keeps for one guest instance.
pub struct BridgeState {
    pub(crate) table: ExternrefTable,
    pub(crate) views: ViewCache,
    pub(crate) exception: ExceptionSlot,
    pub(crate) tasks: TaskQueue,
    pub(crate) finalizers: FinalizerQueue,
    pub(crate) globals: HostValue,
    pub(crate) exports: Option<GuestExports>,
    pub(crate) limits: StoreLimits,
}

impl BridgeState {
    /// Fresh state with the given global object.
    pub fn new(config: &BridgeConfig, globals: HostDict) -> Result<Self> {
        Ok(Self {
            table: ExternrefTable::new(config.table.clone())?,
            views: ViewCache::new(),
            exception: ExceptionSlot::new(),
            tasks: TaskQueue::new(),
            finalizers: FinalizerQueue::new(),
            globals: HostValue::Object(globals),
            exports: None,
            limits: StoreLimitsBuilder::new()
                .memory_size(config.runtime.max_memory_bytes())
                .build(),
        })
    }

    /// The externref table.
    pub fn table(&self) -> &ExternrefTable {
        &self.table
    }

    /// The view cache.
    pub fn views(&self) -> &ViewCache {
        &self.views
    }

    /// The pending-exception slot.
    pub fn exception(&self) -> &ExceptionSlot {
        &self.exception
    }

    /// The task queue.
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Closures awaiting destruction.
    pub fn finalizers(&self) -> &FinalizerQueue {
        &self.finalizers
    }

    /// The global object.
    pub fn globals(&self) -> &HostValue {
        &self.globals
    }

    /// Context for host objects servicing a call.
    pub fn host_cx(&self) -> HostCx {
        HostCx::new(self.tasks.clone())
    }

    /// Whether exports have been resolved.
    pub fn is_instantiated(&self) -> bool {
        self.exports.is_some()
    }
}
