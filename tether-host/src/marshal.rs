//! Declarative call marshalling.
//!
//! Every host operation the guest imports is described by a [`Thunk`]: the
//! import name, the shape of its wasm arguments, the host [`Op`] to run and
//! how to hand the result back. One generic adapter interprets the
//! description, so the wasm signature, argument lifting and result lowering
//! can never disagree with each other.
//!
//! Argument lifting:
//!
//! | Param        | wasm       | host value                                  |
//! |--------------|------------|---------------------------------------------|
//! | `Ref`        | i32        | object the handle points at                 |
//! | `U32`/`I32`  | i32        | number                                      |
//! | `F32`        | f32        | number                                      |
//! | `F64`        | f64        | number                                      |
//! | `Bool`       | i32        | `!= 0`                                      |
//! | `Str`        | i32 i32    | string decoded from guest memory            |
//! | `OwnedStr`   | i32 i32    | decoded string; the guest buffer is freed   |
//! | `Enum`       | i32        | string from the domain table                |
//! | `OptEnum`    | i32        | as `Enum`, or undefined for the table length|
//! | `U8Span`     | i32 i32    | byte array copied out of guest memory       |
//! | `U32Span`    | i32 i32    | array of numbers copied out of guest memory |
//! | `U8SpanMut`  | i32 i32    | byte array written back after the call      |
//!
//! A string out-parameter ([`Ret::StrOut`]) adds a leading i32 scratch
//! pointer; the encoded pointer and length are stored there.

use crate::guest::GuestCx;
use crate::state::BridgeState;
use tether_core::enums::EnumTable;
use tether_core::error::{BridgeError, Result};
use tether_core::memory::{GuestMemory, decode, encode, take_owned, write_out_pair};
use tether_core::tasks::HostCx;
use tether_core::value::{HostArray, HostBytes, HostDict, HostException, HostResult, HostValue};
use wasmtime::{AsContextMut, Caller, Engine, FuncType, Linker, Val, ValType};

/// How one logical argument arrives from the guest.
#[derive(Debug, Clone, Copy)]
pub enum Param {
    /// Externref handle.
    Ref,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Single-precision float.
    F32,
    /// Double.
    F64,
    /// Boolean as i32.
    Bool,
    /// Borrowed UTF-8 span.
    Str,
    /// UTF-8 span whose ownership moves to the host.
    OwnedStr,
    /// Enum code.
    Enum(&'static EnumTable),
    /// Optional enum code.
    OptEnum(&'static EnumTable),
    /// Byte span, copied.
    U8Span,
    /// u32 span (pointer, element count), copied.
    U32Span,
    /// Byte span the host fills in.
    U8SpanMut,
}

impl Param {
    fn push_types(self, out: &mut Vec<ValType>) {
        match self {
            Self::F32 => out.push(ValType::F32),
            Self::F64 => out.push(ValType::F64),
            Self::Str | Self::OwnedStr | Self::U8Span | Self::U32Span | Self::U8SpanMut => {
                out.extend([ValType::I32, ValType::I32])
            }
            _ => out.push(ValType::I32),
        }
    }

    fn lift(
        self,
        guest: &mut GuestCx<'_>,
        raw: &mut RawArgs<'_>,
        writeback: &mut Vec<(u32, HostBytes)>,
    ) -> Result<HostValue> {
        Ok(match self {
            Self::Ref => {
                let handle = raw.u32()?;
                guest.state().table().get(handle)?.clone()
            }
            Self::U32 => HostValue::Number(f64::from(raw.u32()?)),
            Self::I32 => HostValue::Number(f64::from(raw.u32()? as i32)),
            Self::F32 => HostValue::Number(f64::from(raw.f32()?)),
            Self::F64 => HostValue::Number(raw.f64()?),
            Self::Bool => HostValue::Bool(raw.u32()? != 0),
            Self::Str => {
                let (ptr, len) = (raw.u32()?, raw.u32()?);
                HostValue::from(decode(guest, ptr, len)?)
            }
            Self::OwnedStr => {
                let (ptr, len) = (raw.u32()?, raw.u32()?);
                HostValue::from(take_owned(guest, ptr, len)?)
            }
            Self::Enum(table) => HostValue::from(table.to_host(raw.u32()?)?),
            Self::OptEnum(table) => {
                let code = raw.u32()?;
                if code == table.unknown() {
                    HostValue::Undefined
                } else {
                    HostValue::from(table.to_host(code)?)
                }
            }
            Self::U8Span => {
                let (ptr, len) = (raw.u32()?, raw.u32()?);
                let bytes = guest.linear().bytes().to_vec(ptr, len)?;
                HostValue::Bytes(HostBytes::from_vec(bytes))
            }
            Self::U32Span => {
                let (ptr, count) = (raw.u32()?, raw.u32()?);
                let words = guest.linear().words().span(ptr, count)?;
                HostValue::Array(HostArray::from_vec(
                    words.into_iter().map(HostValue::from).collect(),
                ))
            }
            Self::U8SpanMut => {
                let (ptr, len) = (raw.u32()?, raw.u32()?);
                let bytes = HostBytes::from_vec(guest.linear().bytes().to_vec(ptr, len)?);
                writeback.push((ptr, bytes.clone()));
                HostValue::Bytes(bytes)
            }
        })
    }
}

/// How the result goes back to the guest.
#[derive(Debug, Clone, Copy)]
pub enum Ret {
    /// Nothing.
    Void,
    /// A new externref handle.
    Ref,
    /// A handle, or the placeholder 0 for null and undefined.
    OptRef,
    /// `>>> 0`.
    U32,
    /// `| 0`.
    I32,
    /// Double.
    F64,
    /// Truthiness as 0 or 1.
    Bool,
    /// Enum code, or the table length for unknown strings.
    Enum(&'static EnumTable),
    /// String written through a scratch out-parameter.
    StrOut,
    /// As `StrOut`, writing `(0, 0)` for null and undefined.
    OptStrOut,
}

impl Ret {
    fn uses_scratch(self) -> bool {
        matches!(self, Self::StrOut | Self::OptStrOut)
    }

    fn result_type(self) -> Option<ValType> {
        match self {
            Self::Void | Self::StrOut | Self::OptStrOut => None,
            Self::F64 => Some(ValType::F64),
            _ => Some(ValType::I32),
        }
    }

    /// Write `value` for the guest. `None` means the call threw and was
    /// caught: numeric results are zero and out-parameters are left alone.
    fn lower(
        self,
        guest: &mut GuestCx<'_>,
        value: Option<HostValue>,
        scratch: Option<u32>,
        results: &mut [Val],
    ) -> Result<()> {
        let Some(value) = value else {
            if let Some(scratch) = scratch {
                write_out_pair(guest, scratch, 0, 0)?;
            }
            if let Some(slot) = results.first_mut() {
                *slot = match self {
                    Self::F64 => Val::F64(0f64.to_bits()),
                    _ => Val::I32(0),
                };
            }
            return Ok(());
        };

        let lowered = match self {
            Self::Void => None,
            Self::Ref => Some(Val::I32(guest.state_mut().table.intern(value)? as i32)),
            Self::OptRef if value.is_nullish() => Some(Val::I32(0)),
            Self::OptRef => Some(Val::I32(guest.state_mut().table.alloc(value)? as i32)),
            Self::U32 => Some(Val::I32(value.to_u32() as i32)),
            Self::I32 => Some(Val::I32(value.to_i32())),
            Self::F64 => Some(Val::F64(value.to_number().to_bits())),
            Self::Bool => Some(Val::I32(i32::from(value.is_truthy()))),
            Self::Enum(table) => {
                let code = value.as_str().map_or_else(|| table.unknown(), |s| table.to_guest(s));
                Some(Val::I32(code as i32))
            }
            Self::StrOut | Self::OptStrOut => {
                let scratch = scratch.ok_or(BridgeError::TypeMismatch {
                    expected: "scratch pointer".into(),
                    found: "none".into(),
                })?;
                if matches!(self, Self::OptStrOut) && value.is_nullish() {
                    write_out_pair(guest, scratch, 0, 0)?;
                } else {
                    let text = value.as_str().ok_or_else(|| BridgeError::TypeMismatch {
                        expected: "string".into(),
                        found: value.type_name().to_string(),
                    })?;
                    let encoded = encode(guest, text)?;
                    write_out_pair(guest, scratch, encoded.ptr, encoded.len)?;
                }
                None
            }
        };
        if let (Some(val), Some(slot)) = (lowered, results.first_mut()) {
            *slot = val;
        }
        Ok(())
    }
}

/// The host operation a thunk performs on its lifted arguments.
///
/// Receiver-style ops take the receiver as the first argument. Paths are
/// dotted property chains from the global object.
#[derive(Debug, Clone, Copy)]
pub enum Op {
    /// `args[0].name(...rest)`.
    Method(&'static str),
    /// `args[0].name`.
    Get(&'static str),
    /// `args[0].name = args[1]`.
    Set(&'static str),
    /// `args[0][args[1]]`.
    Index,
    /// `Reflect.set(args[0], args[1], args[2])`.
    ReflectSet,
    /// `new path(...args)`.
    Construct(&'static str),
    /// `path.method(...args)`.
    Invoke(&'static str, &'static str),
    /// The value at `path`.
    Static(&'static str),
    /// `{}`.
    NewObject,
    /// `[]`.
    NewArray,
    /// `new Error(args[0])`.
    NewError,
    /// `new Uint8Array(args[0])` from a length or another array.
    NewBytes,
    /// `new Uint8Array(buffer, offset, length)`, copied.
    NewBytesView,
    /// `args[0] instanceof class`.
    InstanceOf(&'static str),
    /// `Promise.resolve(args[0])`.
    ResolvePromise,
    /// `queueMicrotask(args[0])`.
    QueueMicrotask,
}

/// Run `op` against lifted arguments.
pub fn apply(
    op: Op,
    cx: &HostCx,
    globals: &HostValue,
    args: &[HostValue],
) -> HostResult<HostValue> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let rest = args.get(1..).unwrap_or_default();
    match op {
        Op::Method(name) => arg(0).call_method(cx, name, rest),
        Op::Get(name) => arg(0).get_property(cx, name),
        Op::Set(name) => arg(0).set_property(cx, name, arg(1)).map(|()| HostValue::Undefined),
        Op::Index => arg(0).get_property(cx, &property_key(&arg(1))),
        Op::ReflectSet => {
            let target = arg(0);
            if !target.is_object() {
                return Err(HostException::type_error("Reflect.set called on non-object").into());
            }
            target.set_property(cx, &property_key(&arg(1)), arg(2))?;
            Ok(HostValue::Bool(true))
        }
        Op::Construct(path) => resolve(cx, globals, path)?.construct(cx, args),
        Op::Invoke(path, method) => resolve(cx, globals, path)?.call_method(cx, method, args),
        Op::Static(path) => resolve(cx, globals, path),
        Op::NewObject => Ok(HostValue::Object(HostDict::new())),
        Op::NewArray => Ok(HostValue::Array(HostArray::new())),
        Op::NewError => Ok(HostException::error(arg(0).as_str().unwrap_or_default()).into()),
        Op::NewBytes => match arg(0) {
            HostValue::Bytes(source) => Ok(HostValue::Bytes(HostBytes::from_vec(source.to_vec()))),
            HostValue::Array(items) => Ok(HostValue::Bytes(HostBytes::from_vec(
                items.to_vec().iter().map(|v| v.to_u32() as u8).collect(),
            ))),
            other => Ok(HostValue::Bytes(HostBytes::zeroed(other.to_u32() as usize))),
        },
        Op::NewBytesView => {
            let HostValue::Bytes(source) = arg(0) else {
                return Err(HostException::type_error(
                    "first argument must be an ArrayBuffer",
                )
                .into());
            };
            let offset = arg(1).to_u32() as usize;
            let len = arg(2).to_u32() as usize;
            source.with(|bytes| match bytes.get(offset..offset.saturating_add(len)) {
                Some(view) => Ok(HostValue::Bytes(HostBytes::from_vec(view.to_vec()))),
                None => Err(HostException::range_error(format!(
                    "Invalid typed array length: {len} at offset {offset}"
                ))
                .into()),
            })
        }
        Op::InstanceOf(class) => Ok(HostValue::Bool(arg(0).instance_of(class))),
        Op::ResolvePromise => match arg(0) {
            promise @ HostValue::Promise(_) => Ok(promise),
            value => Ok(cx.resolved(value)),
        },
        Op::QueueMicrotask => {
            let callback = arg(0);
            if !callback.is_function() {
                return Err(HostException::type_error(
                    "queueMicrotask argument is not a function",
                )
                .into());
            }
            cx.tasks().queue_microtask(callback);
            Ok(HostValue::Undefined)
        }
    }
}

/// Walk a dotted path from the global object. `globalThis` names the
/// global object itself.
pub fn resolve(cx: &HostCx, globals: &HostValue, path: &str) -> HostResult<HostValue> {
    let mut current = globals.clone();
    for segment in path.split('.') {
        if segment == "globalThis" {
            current = globals.clone();
            continue;
        }
        current = current.get_property(cx, segment)?;
    }
    Ok(current)
}

fn property_key(key: &HostValue) -> String {
    match key {
        HostValue::String(s) => s.to_string(),
        HostValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => format!("{}", *n as u64),
        other => other.debug_string(),
    }
}

/// One host import.
#[derive(Debug)]
pub struct Thunk {
    /// Import name under the bridge's import module.
    pub import: &'static str,
    /// Operation to perform.
    pub op: Op,
    /// Logical arguments in order.
    pub params: &'static [Param],
    /// Result conversion.
    pub ret: Ret,
    /// Route host throws through the exception bridge instead of trapping.
    pub catch: bool,
}

impl Thunk {
    /// The wasm signature this thunk is registered with.
    pub fn func_type(&self, engine: &Engine) -> FuncType {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        if self.ret.uses_scratch() {
            params.push(ValType::I32);
        }
        for param in self.params {
            param.push_types(&mut params);
        }
        FuncType::new(engine, params, self.ret.result_type())
    }

    /// Lift, run, write back, and lower.
    pub fn invoke(&self, guest: &mut GuestCx<'_>, raw: &[Val], results: &mut [Val]) -> Result<()> {
        let mut raw = RawArgs { vals: raw, next: 0 };
        let scratch = match self.ret.uses_scratch() {
            true => Some(raw.u32()?),
            false => None,
        };

        let mut writeback = Vec::new();
        let args = self
            .params
            .iter()
            .map(|param| param.lift(guest, &mut raw, &mut writeback))
            .collect::<Result<Vec<_>>>()?;

        let cx = guest.host_cx();
        let globals = guest.state().globals().clone();
        let outcome = apply(self.op, &cx, &globals, &args);

        for (ptr, bytes) in writeback {
            let filled = bytes.to_vec();
            guest.linear().bytes().write(ptr, &filled)?;
        }

        let value = match outcome {
            Ok(value) => Some(value),
            Err(thrown) if self.catch => {
                tracing::debug!(import = self.import, "host call threw; storing exception");
                guest.store_exception(thrown)?;
                None
            }
            Err(thrown) => {
                return Err(BridgeError::UncaughtHostException {
                    message: format!("{}: {}", self.import, thrown.debug_string()),
                });
            }
        };
        self.ret.lower(guest, value, scratch, results)
    }
}

struct RawArgs<'v> {
    vals: &'v [Val],
    next: usize,
}

impl RawArgs<'_> {
    fn take(&mut self) -> Result<&Val> {
        let val = self.vals.get(self.next).ok_or_else(|| BridgeError::TypeMismatch {
            expected: format!("argument {}", self.next),
            found: "nothing".into(),
        })?;
        self.next += 1;
        Ok(val)
    }

    fn u32(&mut self) -> Result<u32> {
        match self.take()? {
            Val::I32(v) => Ok(*v as u32),
            _ => Err(BridgeError::TypeMismatch {
                expected: "i32".into(),
                found: "another wasm type".into(),
            }),
        }
    }

    fn f32(&mut self) -> Result<f32> {
        match self.take()? {
            Val::F32(bits) => Ok(f32::from_bits(*bits)),
            _ => Err(BridgeError::TypeMismatch {
                expected: "f32".into(),
                found: "another wasm type".into(),
            }),
        }
    }

    fn f64(&mut self) -> Result<f64> {
        match self.take()? {
            Val::F64(bits) => Ok(f64::from_bits(*bits)),
            _ => Err(BridgeError::TypeMismatch {
                expected: "f64".into(),
                found: "another wasm type".into(),
            }),
        }
    }
}

/// Register a thunk table under `module`.
pub fn register_thunks(
    linker: &mut Linker<BridgeState>,
    module: &str,
    thunks: &'static [Thunk],
) -> Result<()> {
    for thunk in thunks {
        let ty = thunk.func_type(linker.engine());
        linker
            .func_new(
                module,
                thunk.import,
                ty,
                move |mut caller: Caller<'_, BridgeState>, params: &[Val], results: &mut [Val]| {
                    let mut guest = GuestCx::new(caller.as_context_mut(), thunk.import)?;
                    thunk.invoke(&mut guest, params, results)?;
                    Ok(())
                },
            )
            .map_err(|e| BridgeError::WasmHostFunction {
                function: thunk.import.to_string(),
                cause: e.to_string(),
            })?;
    }
    tracing::debug!(module, count = thunks.len(), "thunks registered");
    Ok(())
}

/// Build a [`Thunk`] literal.
///
/// ```ignore
/// thunk!("__wbg_createBuffer" => Op::Method("createBuffer"), [P::Ref, P::Ref] -> R::Ref, catch)
/// ```
#[macro_export]
macro_rules! thunk {
    ($import:literal => $op:expr, [$($param:expr),* $(,)?] -> $ret:expr) => {
        $crate::marshal::Thunk {
            import: $import,
            op: $op,
            params: &[$($param),*],
            ret: $ret,
            catch: false,
        }
    };
    ($import:literal => $op:expr, [$($param:expr),* $(,)?] -> $ret:expr, catch) => {
        $crate::marshal::Thunk {
            import: $import,
            op: $op,
            params: &[$($param),*],
            ret: $ret,
            catch: true,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::enums::gpu::GPU_TEXTURE_FORMAT;

    fn signature(thunk: &Thunk) -> (Vec<String>, Vec<String>) {
        let ty = thunk.func_type(&Engine::default());
        (
            ty.params().map(|t| t.to_string()).collect(),
            ty.results().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn signatures_follow_params() {
        let t = thunk!(
            "x" => Op::Method("writeBuffer"),
            [Param::Ref, Param::Ref, Param::F64, Param::U8Span] -> Ret::Void, catch
        );
        let (params, results) = signature(&t);
        assert_eq!(params, ["i32", "i32", "f64", "i32", "i32"]);
        assert!(results.is_empty());
    }

    #[test]
    fn string_out_prepends_scratch() {
        let t = thunk!("x" => Op::Get("label"), [Param::Ref] -> Ret::StrOut);
        let (params, results) = signature(&t);
        assert_eq!(params, ["i32", "i32"]);
        assert!(results.is_empty());

        let t = thunk!("y" => Op::Get("format"), [Param::Ref] -> Ret::Enum(&GPU_TEXTURE_FORMAT));
        assert_eq!(signature(&t).1, ["i32"]);
    }

    #[test]
    fn paths_resolve_from_globals() {
        let cx = HostCx::default();
        let navigator = HostDict::new();
        navigator.insert("gpu", HostValue::from("gpu"));
        let globals = HostDict::new();
        globals.insert("navigator", HostValue::from(navigator));
        let globals = HostValue::from(globals);

        assert_eq!(resolve(&cx, &globals, "navigator.gpu").unwrap().as_str(), Some("gpu"));
        assert_eq!(resolve(&cx, &globals, "globalThis").unwrap(), globals);
        assert!(resolve(&cx, &globals, "missing.deeper").is_err());
    }

    #[test]
    fn descriptor_ops() {
        let cx = HostCx::default();
        let globals = HostValue::Undefined;
        let desc = apply(Op::NewObject, &cx, &globals, &[]).unwrap();
        apply(Op::Set("size"), &cx, &globals, &[desc.clone(), HostValue::from(256u32)]).unwrap();
        let ok = apply(
            Op::ReflectSet,
            &cx,
            &globals,
            &[desc.clone(), HostValue::from("label"), HostValue::from("vertices")],
        )
        .unwrap();
        assert_eq!(ok, HostValue::Bool(true));
        assert_eq!(desc.get_property(&cx, "size").unwrap().as_f64(), Some(256.0));
        assert_eq!(desc.get_property(&cx, "label").unwrap().as_str(), Some("vertices"));

        let list = apply(Op::NewArray, &cx, &globals, &[]).unwrap();
        apply(Op::Method("push"), &cx, &globals, &[list.clone(), desc]).unwrap();
        assert_eq!(apply(Op::Get("length"), &cx, &globals, &[list]).unwrap().as_f64(), Some(1.0));
    }

    #[test]
    fn byte_views_copy_subranges() {
        let cx = HostCx::default();
        let globals = HostValue::Undefined;
        let buffer = HostValue::Bytes(HostBytes::from_vec((0..8).collect()));
        let view = apply(
            Op::NewBytesView,
            &cx,
            &globals,
            &[buffer.clone(), HostValue::from(2u32), HostValue::from(3u32)],
        )
        .unwrap();
        match view {
            HostValue::Bytes(bytes) => assert_eq!(bytes.to_vec(), [2, 3, 4]),
            other => panic!("expected bytes, got {other:?}"),
        }
        let err = apply(
            Op::NewBytesView,
            &cx,
            &globals,
            &[buffer, HostValue::from(6u32), HostValue::from(4u32)],
        )
        .unwrap_err();
        assert!(err.instance_of("RangeError"));
    }

    #[test]
    fn microtasks_need_functions() {
        let cx = HostCx::default();
        let err = apply(Op::QueueMicrotask, &cx, &HostValue::Undefined, &[HostValue::from(1u32)])
            .unwrap_err();
        assert!(err.instance_of("TypeError"));
        assert_eq!(cx.tasks().pending_jobs(), 0);
    }
}
