//! Runtime intrinsics the guest glue imports alongside the thunk tables.
//!
//! These manage handles, strings, numbers, closures and exceptions
//! directly, so they are written out by hand instead of described as
//! thunks.

use crate::guest::GuestCx;
use crate::observability::GUEST_TARGET;
use crate::state::BridgeState;
use tether_core::closure::GuestClosure;
use tether_core::error::{BridgeError, Result};
use tether_core::memory::{
    GuestMemory, decode, encode, field_address, take_owned, write_out_pair,
};
use tether_core::value::{HostBytes, HostValue};
use wasmtime::{AsContextMut, Caller, IntoFunc, Linker};

/// Every intrinsic import name.
pub const NAMES: &[&str] = &[
    "__wbindgen_init_externref_table",
    "__wbindgen_object_drop_ref",
    "__wbindgen_object_clone_ref",
    "__wbindgen_cb_drop",
    "__wbindgen_closure_new",
    "__wbindgen_string_new",
    "__wbindgen_string_get",
    "__wbindgen_number_new",
    "__wbindgen_number_get",
    "__wbindgen_boolean_get",
    "__wbindgen_is_undefined",
    "__wbindgen_is_null",
    "__wbindgen_is_object",
    "__wbindgen_is_function",
    "__wbindgen_is_string",
    "__wbindgen_jsval_eq",
    "__wbindgen_debug_string",
    "__wbindgen_throw",
    "__wbindgen_rethrow",
    "__wbindgen_exn_take",
    "__wbindgen_memory",
    "__wbindgen_memory_size",
    "__wbg_log",
    "__wbg_warn",
    "__wbg_error",
];

fn define<Params, Args>(
    linker: &mut Linker<BridgeState>,
    module: &str,
    name: &str,
    func: impl IntoFunc<BridgeState, Params, Args>,
) -> Result<()> {
    linker
        .func_wrap(module, name, func)
        .map(|_| ())
        .map_err(|e| BridgeError::WasmHostFunction {
            function: name.to_string(),
            cause: e.to_string(),
        })
}

fn flag(value: bool) -> u32 {
    u32::from(value)
}

/// Run `f` against a value in the table.
fn inspect<T>(
    caller: &Caller<'_, BridgeState>,
    handle: u32,
    f: impl FnOnce(&HostValue) -> T,
) -> Result<T> {
    caller.data().table.get(handle).map(f)
}

/// Register every intrinsic under `module`.
pub fn register_intrinsics(linker: &mut Linker<BridgeState>, module: &str) -> Result<()> {
    // Handles.
    define(
        linker,
        module,
        "__wbindgen_init_externref_table",
        |mut caller: Caller<'_, BridgeState>| {
            caller.data_mut().table.init_reserved();
            tracing::debug!("externref table initialised");
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_object_drop_ref",
        |mut caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<()> {
            caller.data_mut().table.free(handle)?;
            Ok(())
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_object_clone_ref",
        |mut caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(caller.data_mut().table.clone_ref(handle)?)
        },
    )?;

    // Closures.
    define(
        linker,
        module,
        "__wbindgen_closure_new",
        |mut caller: Caller<'_, BridgeState>,
         a: u32,
         b: u32,
         dtor: u32,
         trampoline: u32|
         -> wasmtime::Result<u32> {
            let state = caller.data_mut();
            let closure = GuestClosure::new(a, b, dtor, trampoline, state.finalizers.clone());
            Ok(state.table.alloc(HostValue::Function(closure))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_cb_drop",
        |mut caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            let value = caller.data_mut().table.free(handle)?;
            match value {
                Some(HostValue::Function(closure)) => Ok(flag(closure.drop_ref())),
                other => Err(BridgeError::TypeMismatch {
                    expected: "function".into(),
                    found: other.as_ref().map_or("undefined", HostValue::type_name).to_string(),
                }
                .into()),
            }
        },
    )?;

    // Strings and numbers.
    define(
        linker,
        module,
        "__wbindgen_string_new",
        |mut caller: Caller<'_, BridgeState>, ptr: u32, len: u32| -> wasmtime::Result<u32> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbindgen_string_new")?;
            let text = decode(&mut guest, ptr, len)?;
            Ok(guest.state_mut().table.alloc(HostValue::from(text))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_string_get",
        |mut caller: Caller<'_, BridgeState>, scratch: u32, handle: u32| -> wasmtime::Result<()> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbindgen_string_get")?;
            let text = guest.state().table.get(handle)?.as_str().map(str::to_owned);
            match text {
                Some(text) => {
                    let encoded = encode(&mut guest, &text)?;
                    write_out_pair(&mut guest, scratch, encoded.ptr, encoded.len)?;
                }
                None => write_out_pair(&mut guest, scratch, 0, 0)?,
            }
            Ok(())
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_number_new",
        |mut caller: Caller<'_, BridgeState>, value: f64| -> wasmtime::Result<u32> {
            Ok(caller.data_mut().table.alloc(HostValue::Number(value))?)
        },
    )?;
    // Option<f64> out-parameter: presence flag at +0, value at +8.
    define(
        linker,
        module,
        "__wbindgen_number_get",
        |mut caller: Caller<'_, BridgeState>, scratch: u32, handle: u32| -> wasmtime::Result<()> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbindgen_number_get")?;
            let number = guest.state().table.get(handle)?.as_f64();
            let value_at = field_address(scratch, 8)?;
            let mut linear = guest.linear();
            let mut dv = linear.data_view();
            dv.set_f64(value_at, number.unwrap_or(0.0))?;
            dv.set_i32(scratch, i32::from(number.is_some()))?;
            Ok(())
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_boolean_get",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(inspect(&caller, handle, |v| match v.as_bool() {
                Some(b) => flag(b),
                None => 2,
            })?)
        },
    )?;

    // Type tests.
    define(
        linker,
        module,
        "__wbindgen_is_undefined",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(inspect(&caller, handle, |v| flag(matches!(v, HostValue::Undefined)))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_is_null",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(inspect(&caller, handle, |v| flag(matches!(v, HostValue::Null)))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_is_object",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(inspect(&caller, handle, |v| flag(v.is_object()))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_is_function",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(inspect(&caller, handle, |v| flag(v.is_function()))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_is_string",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<u32> {
            Ok(inspect(&caller, handle, |v| flag(v.as_str().is_some()))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_jsval_eq",
        |caller: Caller<'_, BridgeState>, lhs: u32, rhs: u32| -> wasmtime::Result<u32> {
            let table = &caller.data().table;
            Ok(flag(table.get(lhs)? == table.get(rhs)?))
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_debug_string",
        |mut caller: Caller<'_, BridgeState>, scratch: u32, handle: u32| -> wasmtime::Result<()> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbindgen_debug_string")?;
            let rendered = guest.state().table.get(handle)?.debug_string();
            let encoded = encode(&mut guest, &rendered)?;
            write_out_pair(&mut guest, scratch, encoded.ptr, encoded.len)?;
            Ok(())
        },
    )?;

    // Exceptions.
    define(
        linker,
        module,
        "__wbindgen_throw",
        |mut caller: Caller<'_, BridgeState>, ptr: u32, len: u32| -> wasmtime::Result<()> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbindgen_throw")?;
            let message = decode(&mut guest, ptr, len)?;
            tracing::debug!(%message, "guest threw");
            Err(BridgeError::GuestThrow { message }.into())
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_rethrow",
        |mut caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<()> {
            let thrown = caller.data_mut().table.free(handle)?.unwrap_or_default();
            Err(BridgeError::UncaughtHostException {
                message: thrown.debug_string(),
            }
            .into())
        },
    )?;
    define(linker, module, "__wbindgen_exn_take", |mut caller: Caller<'_, BridgeState>| -> u32 {
        caller.data_mut().exception.take().unwrap_or(0)
    })?;

    // Memory.
    define(
        linker,
        module,
        "__wbindgen_memory",
        |mut caller: Caller<'_, BridgeState>| -> wasmtime::Result<u32> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbindgen_memory")?;
            let snapshot = {
                let mut linear = guest.linear();
                let len = tether_core::memory::guest_len(linear.size())?;
                linear.bytes().to_vec(0, len)?
            };
            Ok(guest.state_mut().table.alloc(HostValue::Bytes(HostBytes::from_vec(snapshot)))?)
        },
    )?;
    define(
        linker,
        module,
        "__wbindgen_memory_size",
        |mut caller: Caller<'_, BridgeState>| -> wasmtime::Result<u32> {
            let memory = GuestCx::new(caller.as_context_mut(), "__wbindgen_memory_size")?
                .exports()
                .memory;
            let pages = memory.size(&caller);
            Ok(u32::try_from(pages).map_err(|_| BridgeError::AddressOverflow { value: pages })?)
        },
    )?;

    // Console.
    define(
        linker,
        module,
        "__wbg_log",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<()> {
            let line = inspect(&caller, handle, console_text)?;
            tracing::info!(target: GUEST_TARGET, "{line}");
            Ok(())
        },
    )?;
    define(
        linker,
        module,
        "__wbg_warn",
        |caller: Caller<'_, BridgeState>, handle: u32| -> wasmtime::Result<()> {
            let line = inspect(&caller, handle, console_text)?;
            tracing::warn!(target: GUEST_TARGET, "{line}");
            Ok(())
        },
    )?;
    define(
        linker,
        module,
        "__wbg_error",
        |mut caller: Caller<'_, BridgeState>, ptr: u32, len: u32| -> wasmtime::Result<()> {
            let mut guest = GuestCx::new(caller.as_context_mut(), "__wbg_error")?;
            let line = take_owned(&mut guest, ptr, len)?;
            tracing::error!(target: GUEST_TARGET, "{line}");
            Ok(())
        },
    )?;

    tracing::debug!(module, count = NAMES.len(), "intrinsics registered");
    Ok(())
}

/// Console formatting: strings print bare, everything else as rendered.
fn console_text(value: &HostValue) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.debug_string(),
    }
}
