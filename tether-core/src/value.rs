//! Host-side values referenced from the guest by handle.
//!
//! The guest never sees these directly. It holds integer handles into the
//! [`ExternrefTable`](crate::ExternrefTable) and asks the bridge to operate
//! on whatever the handle points at. Reference kinds compare by identity,
//! so two handles to the same array are equal while two equal-looking
//! dictionaries are not.

use crate::closure::GuestClosure;
use crate::promise::HostPromise;
use crate::tasks::HostCx;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Result of a host operation. Any value can be thrown.
pub type HostResult<T> = std::result::Result<T, HostValue>;

/// Nesting depth at which diagnostic rendering stops recursing.
const MAX_RENDER_DEPTH: usize = 16;

/// A value living on the host side of the boundary.
#[derive(Clone, Default)]
pub enum HostValue {
    /// The absent value.
    #[default]
    Undefined,
    /// The explicit null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A double precision number.
    Number(f64),
    /// An immutable string.
    String(Arc<str>),
    /// A shared, growable array.
    Array(HostArray),
    /// A shared dictionary, typically a descriptor under construction.
    Object(HostDict),
    /// A shared byte array.
    Bytes(HostBytes),
    /// A thrown error.
    Error(Arc<HostException>),
    /// A promise.
    Promise(Arc<HostPromise>),
    /// A guest callback wrapped for host invocation.
    Function(Arc<GuestClosure>),
    /// An opaque host object.
    Native(Arc<dyn HostObject>),
}

/// Behaviour of an opaque host object such as a GPU device or canvas.
///
/// Every method has a default that throws a `TypeError`, so an
/// implementation only overrides what the object actually supports.
pub trait HostObject: Send + Sync + 'static {
    /// Class name used for `instanceof` checks and diagnostics.
    fn class_name(&self) -> &str;

    /// Read a property. Missing properties read as undefined.
    fn get(&self, _cx: &HostCx, _name: &str) -> HostResult<HostValue> {
        Ok(HostValue::Undefined)
    }

    /// Write a property.
    fn set(&self, _cx: &HostCx, name: &str, _value: HostValue) -> HostResult<()> {
        Err(HostException::type_error(format!(
            "Cannot set property {name} of {}",
            self.class_name()
        ))
        .into())
    }

    /// Invoke a method.
    fn call(&self, _cx: &HostCx, method: &str, _args: &[HostValue]) -> HostResult<HostValue> {
        Err(HostException::type_error(format!(
            "{}.{method} is not a function",
            self.class_name()
        ))
        .into())
    }

    /// Invoke as a constructor.
    fn construct(&self, _cx: &HostCx, _args: &[HostValue]) -> HostResult<HostValue> {
        Err(HostException::type_error(format!("{} is not a constructor", self.class_name())).into())
    }

    /// Check class membership.
    fn instance_of(&self, class: &str) -> bool {
        class == self.class_name()
    }

    /// Access the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared array storage.
#[derive(Clone, Default)]
pub struct HostArray(Arc<Mutex<Vec<HostValue>>>);

impl HostArray {
    /// Create an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an array holding the given items.
    pub fn from_vec(items: Vec<HostValue>) -> Self {
        Self(Arc::new(Mutex::new(items)))
    }

    /// Append an item and return the new length.
    pub fn push(&self, value: HostValue) -> usize {
        let mut items = self.0.lock();
        items.push(value);
        items.len()
    }

    /// Remove and return the last item.
    pub fn pop(&self) -> HostValue {
        self.0.lock().pop().unwrap_or_default()
    }

    /// Read an item. Out of range reads yield undefined.
    pub fn get(&self, index: usize) -> HostValue {
        self.0.lock().get(index).cloned().unwrap_or_default()
    }

    /// Write an item, padding with undefined as needed.
    pub fn set(&self, index: usize, value: HostValue) {
        let mut items = self.0.lock();
        if index >= items.len() {
            items.resize(index + 1, HostValue::Undefined);
        }
        items[index] = value;
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Check whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Snapshot of the current items.
    pub fn to_vec(&self) -> Vec<HostValue> {
        self.0.lock().clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared dictionary storage.
#[derive(Clone, Default)]
pub struct HostDict(Arc<Mutex<BTreeMap<String, HostValue>>>);

impl HostDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an entry. Missing entries yield undefined.
    pub fn get(&self, key: &str) -> HostValue {
        self.0.lock().get(key).cloned().unwrap_or_default()
    }

    /// Check whether an entry exists.
    pub fn contains(&self, key: &str) -> bool {
        self.0.lock().contains_key(key)
    }

    /// Insert or replace an entry.
    pub fn insert(&self, key: impl Into<String>, value: HostValue) {
        self.0.lock().insert(key.into(), value);
    }

    /// Entry names in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.0.lock().keys().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Check whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Snapshot of the current entries.
    pub fn entries(&self) -> Vec<(String, HostValue)> {
        self.0
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared byte storage backing typed arrays and fetched bodies.
#[derive(Clone, Default)]
pub struct HostBytes(Arc<Mutex<Vec<u8>>>);

impl HostBytes {
    /// Wrap an owned buffer.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Arc::new(Mutex::new(bytes)))
    }

    /// Create a zero-filled buffer.
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Check whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Copy the contents out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    /// Run a closure over the contents.
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.0.lock())
    }

    /// Run a closure over the mutable contents.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.0.lock())
    }

    /// Copy `src` in at `offset`. Fails with a `RangeError` past the end.
    pub fn write_at(&self, offset: usize, src: &[u8]) -> HostResult<()> {
        let mut bytes = self.0.lock();
        let end = offset
            .checked_add(src.len())
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| HostValue::from(HostException::range_error("offset is out of bounds")))?;
        bytes[offset..end].copy_from_slice(src);
        Ok(())
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Iterator over a fixed snapshot of values.
///
/// `next()` yields `{ done, value }` records the way a JS iterator does and
/// keeps returning `{ done: true }` once drained.
pub struct HostIterator {
    class: &'static str,
    pending: Mutex<VecDeque<HostValue>>,
}

impl HostIterator {
    /// Iterator over `items` reporting `class` as its class name.
    pub fn new(class: &'static str, items: impl IntoIterator<Item = HostValue>) -> Self {
        Self {
            class,
            pending: Mutex::new(items.into_iter().collect()),
        }
    }

    /// Values not yet yielded.
    pub fn remaining(&self) -> usize {
        self.pending.lock().len()
    }

    fn step(&self) -> HostValue {
        let record = HostDict::new();
        match self.pending.lock().pop_front() {
            Some(value) => {
                record.insert("done", HostValue::Bool(false));
                record.insert("value", value);
            }
            None => {
                record.insert("done", HostValue::Bool(true));
                record.insert("value", HostValue::Undefined);
            }
        }
        HostValue::Object(record)
    }
}

impl HostObject for HostIterator {
    fn class_name(&self) -> &str {
        self.class
    }

    fn call(&self, _cx: &HostCx, method: &str, _args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "next" => Ok(self.step()),
            _ => Err(HostException::type_error(format!(
                "{}.{method} is not a function",
                self.class
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Category of a thrown host error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    /// Generic error.
    Error,
    /// Wrong type or unsupported operation.
    TypeError,
    /// Argument outside its permitted range.
    RangeError,
    /// Host refused the operation in its current state.
    OperationError,
    /// GPU rejected a descriptor or command.
    GpuValidationError,
    /// GPU could not satisfy an allocation.
    GpuOutOfMemoryError,
    /// GPU implementation failure.
    GpuInternalError,
    /// The whole device was lost.
    DeviceLost,
}

impl ExceptionKind {
    /// Class name as seen by `instanceof`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::OperationError => "OperationError",
            Self::GpuValidationError => "GPUValidationError",
            Self::GpuOutOfMemoryError => "GPUOutOfMemoryError",
            Self::GpuInternalError => "GPUInternalError",
            Self::DeviceLost => "GPUDeviceLostError",
        }
    }

    /// Map to the guest-visible failure class.
    pub fn failure_class(self) -> FailureClass {
        match self {
            Self::TypeError | Self::RangeError | Self::GpuValidationError => {
                FailureClass::Configuration
            }
            Self::GpuOutOfMemoryError => FailureClass::OutOfMemory,
            Self::DeviceLost => FailureClass::DeviceLost,
            Self::Error | Self::OperationError | Self::GpuInternalError => FailureClass::Internal,
        }
    }

    fn is_gpu_error(self) -> bool {
        matches!(
            self,
            Self::GpuValidationError | Self::GpuOutOfMemoryError | Self::GpuInternalError
        )
    }

    fn instance_of(self, class: &str) -> bool {
        class == self.name()
            || (class == "GPUError" && self.is_gpu_error())
            || (class == "Error" && !self.is_gpu_error())
    }
}

/// Guest-visible classification of a failure, used to choose between
/// retrying, reinitializing, and aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Bad arguments to a creation call.
    Configuration,
    /// The host lost the whole device.
    DeviceLost,
    /// The host could not allocate.
    OutOfMemory,
    /// Anything else.
    Internal,
}

impl FailureClass {
    /// Stable tag string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::DeviceLost => "device_lost",
            Self::OutOfMemory => "out_of_memory",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exception object raised by a host API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostException {
    /// Error category.
    pub kind: ExceptionKind,
    /// Human-readable message.
    pub message: String,
    /// Stack or provenance text, possibly empty.
    pub stack: String,
}

impl HostException {
    /// Create an exception of the given kind.
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: String::new(),
        }
    }

    /// Attach stack text.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    /// Generic error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::Error, message)
    }

    /// `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    /// `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::RangeError, message)
    }

    /// `OperationError`.
    pub fn operation_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::OperationError, message)
    }

    /// GPU validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::GpuValidationError, message)
    }

    /// GPU allocation failure.
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::GpuOutOfMemoryError, message)
    }

    /// GPU internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::GpuInternalError, message)
    }

    /// Device loss.
    pub fn device_lost(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::DeviceLost, message)
    }

    /// Guest-visible failure class.
    pub fn failure_class(&self) -> FailureClass {
        self.kind.failure_class()
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

impl From<HostException> for HostValue {
    fn from(exception: HostException) -> Self {
        Self::Error(Arc::new(exception))
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for HostValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::String(Arc::from(value))
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::String(Arc::from(value))
    }
}

impl From<HostDict> for HostValue {
    fn from(value: HostDict) -> Self {
        Self::Object(value)
    }
}

impl From<HostArray> for HostValue {
    fn from(value: HostArray) -> Self {
        Self::Array(value)
    }
}

impl From<HostBytes> for HostValue {
    fn from(value: HostBytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Arc<HostPromise>> for HostValue {
    fn from(value: Arc<HostPromise>) -> Self {
        Self::Promise(value)
    }
}

impl HostValue {
    /// Wrap a host object.
    pub fn native(object: impl HostObject) -> Self {
        Self::Native(Arc::new(object))
    }

    /// Type label used in diagnostics and error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "Array",
            Self::Object(_) => "Object",
            Self::Bytes(_) => "Uint8Array",
            Self::Error(e) => e.kind.name(),
            Self::Promise(_) => "Promise",
            Self::Function(_) => "Function",
            Self::Native(o) => o.class_name(),
        }
    }

    /// Undefined or null.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// `typeof v === 'object' && v !== null`.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Array(_)
                | Self::Object(_)
                | Self::Bytes(_)
                | Self::Error(_)
                | Self::Promise(_)
                | Self::Native(_)
        )
    }

    /// Callable from the host event loop.
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Truthiness as a boolean test would see it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The number, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric conversion with the usual coercions.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Null => 0.0,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// Unsigned 32-bit conversion (`v >>> 0`).
    pub fn to_u32(&self) -> u32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        n.trunc().rem_euclid(4_294_967_296.0) as u32
    }

    /// Signed 32-bit conversion (`v | 0`).
    pub fn to_i32(&self) -> i32 {
        self.to_u32() as i32
    }

    /// Downcast an opaque host object.
    pub fn downcast<T: HostObject>(&self) -> Option<&T> {
        match self {
            Self::Native(object) => object.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Failure class of a thrown error value.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::Error(e) => Some(e.failure_class()),
            _ => None,
        }
    }

    /// Read a property.
    pub fn get_property(&self, cx: &HostCx, name: &str) -> HostResult<HostValue> {
        match self {
            Self::Undefined | Self::Null => Err(HostException::type_error(format!(
                "Cannot read properties of {} (reading '{name}')",
                self.type_name()
            ))
            .into()),
            Self::String(s) if name == "length" => Ok(Self::from(s.encode_utf16().count() as f64)),
            Self::Array(items) => Ok(match name {
                "length" => Self::from(items.len() as f64),
                _ => name
                    .parse::<usize>()
                    .map(|i| items.get(i))
                    .unwrap_or_default(),
            }),
            Self::Object(dict) => Ok(dict.get(name)),
            Self::Bytes(bytes) => Ok(match name {
                "length" | "byteLength" => Self::from(bytes.len() as f64),
                "buffer" => self.clone(),
                _ => Self::Undefined,
            }),
            Self::Error(e) => Ok(match name {
                "message" => Self::from(e.message.as_str()),
                "stack" => Self::from(e.stack.as_str()),
                "name" => Self::from(e.kind.name()),
                _ => Self::Undefined,
            }),
            Self::Native(object) => object.get(cx, name),
            _ => Ok(Self::Undefined),
        }
    }

    /// Write a property.
    pub fn set_property(&self, cx: &HostCx, name: &str, value: HostValue) -> HostResult<()> {
        match self {
            Self::Object(dict) => {
                dict.insert(name, value);
                Ok(())
            }
            Self::Array(items) => match name.parse::<usize>() {
                Ok(index) => {
                    items.set(index, value);
                    Ok(())
                }
                Err(_) => Err(HostException::type_error(format!(
                    "Cannot set property {name} of Array"
                ))
                .into()),
            },
            Self::Native(object) => object.set(cx, name, value),
            _ => Err(HostException::type_error(format!(
                "Cannot set properties of {} (setting '{name}')",
                self.type_name()
            ))
            .into()),
        }
    }

    /// Invoke a method.
    pub fn call_method(
        &self,
        cx: &HostCx,
        name: &str,
        args: &[HostValue],
    ) -> HostResult<HostValue> {
        match (self, name) {
            (Self::Native(object), _) => object.call(cx, name, args),
            (Self::Array(items), "push") => {
                let mut len = items.len();
                for arg in args {
                    len = items.push(arg.clone());
                }
                Ok(Self::from(len as f64))
            }
            (Self::Array(items), "pop") => Ok(items.pop()),
            (Self::Array(items), "keys") => {
                let indices = (0..items.len()).map(|i| Self::from(i as f64));
                Ok(Self::native(HostIterator::new("Array Iterator", indices)))
            }
            (Self::Array(items), "values") => {
                Ok(Self::native(HostIterator::new("Array Iterator", items.to_vec())))
            }
            (Self::Bool(_) | Self::Number(_) | Self::String(_), "valueOf") => Ok(self.clone()),
            (Self::Bytes(bytes), "set") => {
                let source = match args.first() {
                    Some(Self::Bytes(src)) => src.to_vec(),
                    Some(Self::Array(src)) => {
                        src.to_vec().iter().map(|v| v.to_u32() as u8).collect()
                    }
                    _ => return Err(HostException::type_error(
                        "invalid source for Uint8Array.set",
                    )
                    .into()),
                };
                let offset = args.get(1).map(HostValue::to_u32).unwrap_or(0) as usize;
                bytes.write_at(offset, &source)?;
                Ok(Self::Undefined)
            }
            (Self::Promise(promise), "then") => {
                let on_fulfilled = args.first().filter(|f| f.is_function()).cloned();
                let on_rejected = args.get(1).filter(|f| f.is_function()).cloned();
                Ok(Self::Promise(promise.then(on_fulfilled, on_rejected)))
            }
            (Self::Promise(promise), "catch") => {
                let on_rejected = args.first().filter(|f| f.is_function()).cloned();
                Ok(Self::Promise(promise.then(None, on_rejected)))
            }
            (Self::Undefined | Self::Null, _) => Err(HostException::type_error(format!(
                "Cannot read properties of {} (reading '{name}')",
                self.type_name()
            ))
            .into()),
            _ => Err(HostException::type_error(format!(
                "{}.{name} is not a function",
                self.type_name()
            ))
            .into()),
        }
    }

    /// Invoke as a constructor.
    pub fn construct(&self, cx: &HostCx, args: &[HostValue]) -> HostResult<HostValue> {
        match self {
            Self::Native(object) => object.construct(cx, args),
            _ => Err(HostException::type_error(format!(
                "{} is not a constructor",
                self.type_name()
            ))
            .into()),
        }
    }

    /// Class membership test. Never throws.
    pub fn instance_of(&self, class: &str) -> bool {
        match (self, class) {
            (_, "Object") => self.is_object(),
            (Self::Array(_), "Array") => true,
            (Self::Bytes(_), "Uint8Array") => true,
            (Self::Promise(_), "Promise") => true,
            (Self::Function(_), "Function") => true,
            (Self::Error(e), _) => e.kind.instance_of(class),
            (Self::Native(object), _) => object.instance_of(class),
            _ => false,
        }
    }

    /// Render for diagnostics.
    pub fn debug_string(&self) -> String {
        self.render(0)
    }

    fn render(&self, depth: usize) -> String {
        if depth > MAX_RENDER_DEPTH {
            return "...".to_string();
        }
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => serde_json::to_string(&**s).unwrap_or_else(|_| format!("\"{s}\"")),
            Self::Array(items) => {
                let parts: Vec<String> =
                    items.to_vec().iter().map(|v| v.render(depth + 1)).collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Object(_) => format!("Object({})", self.to_json_at(depth)),
            Self::Bytes(bytes) => format!("Uint8Array({})", bytes.len()),
            Self::Error(e) => format!("{}: {}\n{}", e.kind.name(), e.message, e.stack),
            Self::Promise(_) => "[object Promise]".to_string(),
            Self::Function(closure) => format!("Function(closure#{})", closure.id()),
            Self::Native(object) => format!("[object {}]", object.class_name()),
        }
    }

    /// JSON projection of plain data. Opaque values map to `null`.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> serde_json::Value {
        use serde_json::Value as Json;
        if depth > MAX_RENDER_DEPTH {
            return Json::Null;
        }
        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Self::String(s) => Json::String(s.to_string()),
            Self::Array(items) => Json::Array(
                items
                    .to_vec()
                    .iter()
                    .map(|v| v.to_json_at(depth + 1))
                    .collect(),
            ),
            Self::Object(dict) => Json::Object(
                dict.entries()
                    .into_iter()
                    .filter(|(_, v)| !matches!(v, Self::Undefined))
                    .map(|(k, v)| (k, v.to_json_at(depth + 1)))
                    .collect(),
            ),
            Self::Error(e) => serde_json::json!({ "name": e.kind.name(), "message": e.message }),
            _ => Json::Null,
        }
    }
}

/// Format a number the way the host renders it: integers without a
/// fractional part, and the special values by name.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.ptr_eq(b),
            (Self::Error(a), Self::Error(b)) => Arc::ptr_eq(a, b),
            (Self::Promise(a), Self::Promise(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Native(a), Self::Native(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canvas;

    impl HostObject for Canvas {
        fn class_name(&self) -> &str {
            "HTMLCanvasElement"
        }

        fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
            Ok(match name {
                "width" => HostValue::from(640u32),
                _ => HostValue::Undefined,
            })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn reference_kinds_compare_by_identity() {
        let a = HostValue::from(HostDict::new());
        let b = HostValue::from(HostDict::new());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(HostValue::from("x"), HostValue::from("x"));
    }

    #[test]
    fn property_access() {
        let cx = HostCx::default();
        let dict = HostValue::from(HostDict::new());
        dict.set_property(&cx, "a", HostValue::from(1u32)).unwrap();
        assert_eq!(dict.get_property(&cx, "a").unwrap(), HostValue::from(1u32));
        assert_eq!(dict.get_property(&cx, "b").unwrap(), HostValue::Undefined);

        let err = HostValue::Null.get_property(&cx, "a").unwrap_err();
        assert!(err.instance_of("TypeError"));

        let canvas = HostValue::native(Canvas);
        assert_eq!(canvas.get_property(&cx, "width").unwrap().to_u32(), 640);
        assert!(canvas.instance_of("HTMLCanvasElement"));
        assert!(canvas.instance_of("Object"));
        assert!(canvas.downcast::<Canvas>().is_some());
        assert!(canvas.call_method(&cx, "getContext", &[]).is_err());
    }

    #[test]
    fn array_push_and_index() {
        let cx = HostCx::default();
        let arr = HostValue::from(HostArray::new());
        let len = arr
            .call_method(&cx, "push", &[HostValue::from(7u32)])
            .unwrap();
        assert_eq!(len.to_u32(), 1);
        assert_eq!(arr.get_property(&cx, "0").unwrap().to_u32(), 7);
        assert_eq!(arr.get_property(&cx, "length").unwrap().to_u32(), 1);
    }

    #[test]
    fn array_keys_iterate_to_completion() {
        let cx = HostCx::default();
        let items = vec![HostValue::from("a"), HostValue::from("b")];
        let arr = HostValue::from(HostArray::from_vec(items));
        let keys = arr.call_method(&cx, "keys", &[]).unwrap();
        assert!(keys.instance_of("Array Iterator"));

        let mut seen = Vec::new();
        loop {
            let step = keys.call_method(&cx, "next", &[]).unwrap();
            if step.get_property(&cx, "done").unwrap().is_truthy() {
                break;
            }
            seen.push(step.get_property(&cx, "value").unwrap().to_u32());
        }
        assert_eq!(seen, vec![0, 1]);

        let after = keys.call_method(&cx, "next", &[]).unwrap();
        assert_eq!(after.get_property(&cx, "done").unwrap(), HostValue::Bool(true));
        assert_eq!(after.get_property(&cx, "value").unwrap(), HostValue::Undefined);
    }

    #[test]
    fn iterator_snapshot_ignores_later_pushes() {
        let cx = HostCx::default();
        let items = HostArray::from_vec(vec![HostValue::from(1u32)]);
        let values = HostValue::from(items.clone()).call_method(&cx, "values", &[]).unwrap();
        items.push(HostValue::from(2u32));
        let iter = values.downcast::<HostIterator>().unwrap();
        assert_eq!(iter.remaining(), 1);
        assert!(values.call_method(&cx, "return", &[]).is_err());
    }

    #[test]
    fn primitives_answer_value_of() {
        let cx = HostCx::default();
        for value in [HostValue::from(3u32), HostValue::Bool(true), HostValue::from("s")] {
            assert_eq!(value.call_method(&cx, "valueOf", &[]).unwrap(), value);
        }
        assert!(HostValue::from(HostDict::new()).call_method(&cx, "valueOf", &[]).is_err());
    }

    #[test]
    fn number_coercions_wrap() {
        assert_eq!(HostValue::from(-1.0).to_u32(), u32::MAX);
        assert_eq!(HostValue::from(4_294_967_297.0).to_u32(), 1);
        assert_eq!(HostValue::Undefined.to_u32(), 0);
        assert_eq!(HostValue::from(f64::NAN).to_u32(), 0);
        assert_eq!(HostValue::from(3_000_000_000.0).to_i32(), -1_294_967_296);
    }

    #[test]
    fn debug_strings() {
        assert_eq!(HostValue::from(1.0).debug_string(), "1");
        assert_eq!(HostValue::from(1.5).debug_string(), "1.5");
        assert_eq!(HostValue::from("hi").debug_string(), "\"hi\"");
        let arr = HostArray::from_vec(vec![HostValue::from(true), HostValue::Null]);
        assert_eq!(HostValue::from(arr).debug_string(), "[true, null]");

        let dict = HostDict::new();
        dict.insert("a", HostValue::from(1u32));
        assert_eq!(HostValue::from(dict).debug_string(), "Object({\"a\":1.0})");

        let err = HostValue::from(
            HostException::validation("bad pipeline").with_stack("at createRenderPipeline"),
        );
        assert_eq!(
            err.debug_string(),
            "GPUValidationError: bad pipeline\nat createRenderPipeline"
        );
    }

    #[test]
    fn self_referential_arrays_render() {
        let arr = HostArray::new();
        arr.push(HostValue::from(arr.clone()));
        let rendered = HostValue::from(arr).debug_string();
        assert!(rendered.contains("..."));
    }

    #[test]
    fn failure_classes() {
        assert_eq!(
            HostException::validation("x").failure_class(),
            FailureClass::Configuration
        );
        assert_eq!(
            HostException::out_of_memory("x").failure_class(),
            FailureClass::OutOfMemory
        );
        assert_eq!(
            HostException::device_lost("x").failure_class(),
            FailureClass::DeviceLost
        );
        let thrown = HostValue::from(HostException::validation("x"));
        assert!(thrown.instance_of("GPUValidationError"));
        assert!(thrown.instance_of("GPUError"));
        assert!(!thrown.instance_of("Error"));
        assert!(HostValue::from(HostException::type_error("x")).instance_of("Error"));
    }
}
