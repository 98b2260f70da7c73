//! The live guest seen through the core bridge traits.
//!
//! [`GuestCx`] borrows a store context, from a host function's `Caller` or
//! from the lifecycle controller's `Store`, and implements
//! [`GuestMemory`], [`GuestAllocator`], [`GuestCalls`] and [`GuestRuntime`]
//! on top of the resolved [`GuestExports`]. The codec, closure wrapper and
//! task runner therefore work identically against wasmtime and the mock
//! guest.

use crate::state::{BridgeState, GuestExports};
use tether_core::closure::GuestCalls;
use tether_core::error::{BridgeError, Result};
use tether_core::memory::{GuestAllocator, GuestMemory, Linear};
use tether_core::table::ExternrefTable;
use tether_core::tasks::{GuestRuntime, HostCx};
use tether_core::value::HostValue;
use wasmtime::{AsContextMut, Ref, StoreContextMut, Val};

/// Convert a wasmtime error into a bridge error, recovering a
/// [`BridgeError`] raised by a nested host function.
pub fn trap_error(function: &str, error: wasmtime::Error) -> BridgeError {
    match error.downcast::<BridgeError>() {
        Ok(inner) => inner,
        Err(other) => BridgeError::WasmTrap {
            function: function.to_string(),
            cause: format!("{other:#}"),
        },
    }
}

/// Store context plus the guest's exports.
pub struct GuestCx<'a> {
    cx: StoreContextMut<'a, BridgeState>,
    exports: GuestExports,
}

impl<'a> GuestCx<'a> {
    /// Wrap a store context. Fails before instantiation finishes.
    pub fn new(cx: StoreContextMut<'a, BridgeState>, operation: &str) -> Result<Self> {
        let exports = cx
            .data()
            .exports
            .clone()
            .ok_or_else(|| BridgeError::NotInitialized {
                operation: operation.to_string(),
            })?;
        Ok(Self { cx, exports })
    }

    /// Bridge state.
    pub fn state(&self) -> &BridgeState {
        self.cx.data()
    }

    /// Mutable bridge state.
    pub fn state_mut(&mut self) -> &mut BridgeState {
        self.cx.data_mut()
    }

    /// The resolved exports.
    pub fn exports(&self) -> &GuestExports {
        &self.exports
    }

    /// Host call context.
    pub fn host_cx(&self) -> HostCx {
        self.state().host_cx()
    }

    /// The underlying store context.
    pub fn store(&mut self) -> StoreContextMut<'_, BridgeState> {
        self.cx.as_context_mut()
    }

    /// Hand a thrown value to the guest.
    ///
    /// A guest exporting `__wbindgen_exn_store` receives the handle
    /// directly and owns it. Otherwise the handle waits in the exception
    /// slot for `__wbindgen_exn_take`.
    pub fn store_exception(&mut self, thrown: HostValue) -> Result<()> {
        match self.exports.exn_store.clone() {
            Some(exn_store) => {
                tracing::debug!(
                    exception = %thrown.debug_string(),
                    "forwarding host exception to guest"
                );
                let handle = self.state_mut().table.alloc(thrown)?;
                exn_store
                    .call(&mut self.cx, handle)
                    .map_err(|e| trap_error("__wbindgen_exn_store", e))
            }
            None => {
                let state = self.state_mut();
                state.exception.capture::<()>(&mut state.table, Err(thrown))?;
                Ok(())
            }
        }
    }
}

impl GuestMemory for GuestCx<'_> {
    fn linear(&mut self) -> Linear<'_> {
        let (data, state) = self.exports.memory.data_and_store_mut(self.cx.as_context_mut());
        Linear::new(data, &mut state.views)
    }
}

impl GuestAllocator for GuestCx<'_> {
    fn malloc(&mut self, size: u32, align: u32) -> Result<u32> {
        self.exports
            .malloc
            .call(&mut self.cx, (size, align))
            .map_err(|e| BridgeError::AllocationFailed {
                requested: size,
                cause: format!("{e:#}"),
            })
    }

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32, align: u32) -> Result<u32> {
        let realloc = self.exports.realloc.clone().ok_or(BridgeError::AllocationFailed {
            requested: new_size,
            cause: "guest does not export __wbindgen_realloc".into(),
        })?;
        realloc
            .call(&mut self.cx, (ptr, old_size, new_size, align))
            .map_err(|e| BridgeError::AllocationFailed {
                requested: new_size,
                cause: format!("{e:#}"),
            })
    }

    fn free(&mut self, ptr: u32, size: u32, align: u32) -> Result<()> {
        self.exports
            .free
            .call(&mut self.cx, (ptr, size, align))
            .map_err(|e| trap_error("__wbindgen_free", e))
    }

    fn can_realloc(&self) -> bool {
        self.exports.realloc.is_some()
    }
}

impl GuestCalls for GuestCx<'_> {
    fn call_indirect(&mut self, index: u32, args: &[u32]) -> Result<()> {
        let table = self.exports.table.ok_or(BridgeError::TrampolineMissing { index })?;
        let func = match table.get(&mut self.cx, index.into()) {
            Some(Ref::Func(Some(func))) => func,
            _ => return Err(BridgeError::TrampolineMissing { index }),
        };
        let params: Vec<Val> = args.iter().map(|a| Val::I32(*a as i32)).collect();
        let arity = func.ty(&self.cx).results().len();
        let mut results = vec![Val::I32(0); arity];
        func.call(&mut self.cx, &params, &mut results)
            .map_err(|e| trap_error(&format!("table[{index}]"), e))
    }
}

impl GuestRuntime for GuestCx<'_> {
    fn table_mut(&mut self) -> &mut ExternrefTable {
        &mut self.state_mut().table
    }
}
