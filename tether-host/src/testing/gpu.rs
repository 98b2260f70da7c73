//! In-memory graphics device.
//!
//! Resources are property bags, command encoders record what they were
//! asked to do, and the queue keeps every write so tests can assert on the
//! bytes that crossed the boundary. Validation follows the device's error
//! model: most mistakes are reported through error scopes or the
//! uncaptured-error handler rather than thrown.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tether_core::enums::gpu::GPU_TEXTURE_FORMAT;
use tether_core::promise::HostPromise;
use tether_core::tasks::{HostCx, Job};
use tether_core::value::{
    HostArray, HostDict, HostException, HostIterator, HostObject, HostResult, HostValue,
};

/// Read a descriptor field, treating a missing descriptor as empty.
pub(crate) fn field(cx: &HostCx, desc: &HostValue, name: &str) -> HostValue {
    if desc.is_nullish() {
        return HostValue::Undefined;
    }
    desc.get_property(cx, name).unwrap_or_default()
}

fn arg(args: &[HostValue], index: usize) -> HostValue {
    args.get(index).cloned().unwrap_or_default()
}

/// A feature set answering `has`.
pub struct MockFeatures {
    names: Vec<String>,
}

impl MockFeatures {
    /// Features with these names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl HostObject for MockFeatures {
    fn class_name(&self) -> &str {
        "GPUSupportedFeatures"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "size" => HostValue::from(self.names.len() as u32),
            _ => HostValue::Undefined,
        })
    }

    fn call(&self, _cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "has" => {
                let name = arg(args, 0);
                Ok(HostValue::Bool(name.as_str().is_some_and(|n| self.contains(n))))
            }
            "keys" | "values" => {
                let names = self.names.iter().map(|n| HostValue::from(n.as_str()));
                Ok(HostValue::native(HostIterator::new("SetIterator", names)))
            }
            _ => Err(HostException::type_error(format!(
                "GPUSupportedFeatures.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Device limits with the baseline defaults.
pub struct MockLimits {
    values: BTreeMap<&'static str, f64>,
}

impl Default for MockLimits {
    fn default() -> Self {
        let values = [
            ("maxTextureDimension1D", 8192.0),
            ("maxTextureDimension2D", 8192.0),
            ("maxTextureDimension3D", 2048.0),
            ("maxTextureArrayLayers", 256.0),
            ("maxBindGroups", 4.0),
            ("maxBindingsPerBindGroup", 1000.0),
            ("maxDynamicUniformBuffersPerPipelineLayout", 8.0),
            ("maxDynamicStorageBuffersPerPipelineLayout", 4.0),
            ("maxSampledTexturesPerShaderStage", 16.0),
            ("maxSamplersPerShaderStage", 16.0),
            ("maxStorageBuffersPerShaderStage", 8.0),
            ("maxStorageTexturesPerShaderStage", 4.0),
            ("maxUniformBuffersPerShaderStage", 12.0),
            ("maxUniformBufferBindingSize", 65536.0),
            ("maxStorageBufferBindingSize", 134_217_728.0),
            ("maxBufferSize", 268_435_456.0),
            ("minUniformBufferOffsetAlignment", 256.0),
            ("minStorageBufferOffsetAlignment", 256.0),
            ("maxVertexBuffers", 8.0),
            ("maxVertexAttributes", 16.0),
            ("maxVertexBufferArrayStride", 2048.0),
            ("maxColorAttachments", 8.0),
            ("maxColorAttachmentBytesPerSample", 32.0),
            ("maxComputeWorkgroupStorageSize", 16384.0),
            ("maxComputeInvocationsPerWorkgroup", 256.0),
            ("maxComputeWorkgroupSizeX", 256.0),
            ("maxComputeWorkgroupSizeY", 256.0),
            ("maxComputeWorkgroupSizeZ", 64.0),
            ("maxComputeWorkgroupsPerDimension", 65535.0),
        ];
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl MockLimits {
    /// Look up a limit.
    pub fn limit(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

impl HostObject for MockLimits {
    fn class_name(&self) -> &str {
        "GPUSupportedLimits"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(self.limit(name).map_or(HostValue::Undefined, HostValue::Number))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Entry point reached through `navigator.gpu`.
pub struct MockGpu {
    adapter: Option<Arc<MockAdapter>>,
}

impl MockGpu {
    /// A GPU with one adapter.
    pub fn new() -> Self {
        Self {
            adapter: Some(Arc::new(MockAdapter::new())),
        }
    }

    /// A GPU whose adapter request resolves to null.
    pub fn unavailable() -> Self {
        Self { adapter: None }
    }

    /// The adapter, if any.
    pub fn adapter(&self) -> Option<&Arc<MockAdapter>> {
        self.adapter.as_ref()
    }
}

impl Default for MockGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl HostObject for MockGpu {
    fn class_name(&self) -> &str {
        "GPU"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "wgslLanguageFeatures" => HostValue::native(MockFeatures::new([
                "readonly_and_readwrite_storage_textures",
            ])),
            _ => HostValue::Undefined,
        })
    }

    fn call(&self, cx: &HostCx, method: &str, _args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "requestAdapter" => Ok(cx.resolved(match &self.adapter {
                Some(adapter) => HostValue::Native(adapter.clone()),
                None => HostValue::Null,
            })),
            "getPreferredCanvasFormat" => Ok(HostValue::from("bgra8unorm")),
            _ => Err(HostException::type_error(format!("GPU.{method} is not a function")).into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Adapter handing out one shared device.
pub struct MockAdapter {
    features: Arc<MockFeatures>,
    limits: Arc<MockLimits>,
    device: Arc<MockDevice>,
}

impl MockAdapter {
    /// Adapter with a small feature set and default limits.
    pub fn new() -> Self {
        Self {
            features: Arc::new(MockFeatures::new(["texture-compression-bc", "depth-clip-control"])),
            limits: Arc::new(MockLimits::default()),
            device: Arc::new(MockDevice::new()),
        }
    }

    /// The device every `requestDevice` resolves to.
    pub fn device(&self) -> &Arc<MockDevice> {
        &self.device
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HostObject for MockAdapter {
    fn class_name(&self) -> &str {
        "GPUAdapter"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "features" => HostValue::Native(self.features.clone()),
            "limits" => HostValue::Native(self.limits.clone()),
            _ => HostValue::Undefined,
        })
    }

    fn call(&self, cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "requestDevice" => {
                let required = field(cx, &arg(args, 0), "requiredFeatures");
                if let HostValue::Array(list) = required {
                    for feature in list.to_vec() {
                        let name = feature.as_str().unwrap_or_default().to_string();
                        if !self.features.contains(&name) {
                            let reason = format!("Unsupported feature: {name}");
                            return Ok(cx.rejected(HostException::type_error(reason).into()));
                        }
                    }
                }
                Ok(cx.resolved(HostValue::Native(self.device.clone())))
            }
            _ => Err(HostException::type_error(format!(
                "GPUAdapter.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ErrorScope {
    filter: String,
    error: Option<HostValue>,
}

#[derive(Default)]
struct DeviceState {
    scopes: Vec<ErrorScope>,
    lost: Option<Arc<HostPromise>>,
    destroyed: bool,
    label: String,
    handler: HostValue,
    uncaptured: Vec<HostValue>,
    calls: Vec<String>,
}

/// Device with error scopes, a loss promise and a recording queue.
pub struct MockDevice {
    queue: Arc<MockQueue>,
    state: Mutex<DeviceState>,
}

impl MockDevice {
    /// A fresh device.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(MockQueue::default()),
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// The device's queue.
    pub fn queue(&self) -> &Arc<MockQueue> {
        &self.queue
    }

    /// Methods called on the device, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Errors no scope captured.
    pub fn uncaptured(&self) -> Vec<HostValue> {
        self.state.lock().uncaptured.clone()
    }

    /// Whether `destroy` was called.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Simulate losing the device for a reason other than `destroy`.
    pub fn lose(&self, cx: &HostCx, message: &str) {
        self.settle_lost(cx, "unknown", message);
    }

    fn lost_promise(&self, cx: &HostCx) -> Arc<HostPromise> {
        let mut state = self.state.lock();
        state.lost.get_or_insert_with(|| cx.promise()).clone()
    }

    fn settle_lost(&self, cx: &HostCx, reason: &'static str, message: &str) {
        let promise = self.lost_promise(cx);
        promise.resolve(HostValue::native(MockDeviceLostInfo {
            reason,
            message: message.to_string(),
        }));
    }

    /// Report an error the way the device does: to the innermost matching
    /// error scope, else to the uncaptured-error handler.
    pub fn report(&self, cx: &HostCx, error: HostException) {
        let filter = match error.failure_class() {
            tether_core::value::FailureClass::OutOfMemory => "out-of-memory",
            tether_core::value::FailureClass::Internal => "internal",
            _ => "validation",
        };
        let error = HostValue::from(error);
        let mut state = self.state.lock();
        if let Some(scope) = state.scopes.iter_mut().rev().find(|s| s.filter == filter) {
            if scope.error.is_none() {
                scope.error = Some(error);
            }
            return;
        }
        tracing::debug!(filter, error = %error.debug_string(), "uncaptured device error");
        state.uncaptured.push(error.clone());
        if state.handler.is_function() {
            let event = HostDict::new();
            event.insert("error", error);
            cx.tasks().enqueue(Job::Callback {
                callback: state.handler.clone(),
                args: vec![HostValue::from(event)],
            });
        }
    }

    fn create(&self, cx: &HostCx, method: &str, desc: &HostValue) -> HostResult<HostValue> {
        let label = field(cx, desc, "label");
        let resource = |class: &'static str| {
            let res = MockResource::new(class);
            if let Some(l) = label.as_str() {
                res.props.insert("label", HostValue::from(l));
            }
            res
        };
        let created = match method {
            "createBuffer" => {
                let size = field(cx, desc, "size").to_number();
                let usage = field(cx, desc, "usage").to_u32();
                let mapped = field(cx, desc, "mappedAtCreation").is_truthy();
                if mapped && size as u64 % 4 != 0 {
                    return Err(HostException::range_error(
                        "mappedAtCreation requires size to be a multiple of 4",
                    )
                    .into());
                }
                if usage == 0 {
                    self.report(cx, HostException::validation("Buffer usage must not be 0"));
                }
                let buffer = resource("GPUBuffer");
                buffer.props.insert("size", HostValue::Number(size));
                buffer.props.insert("usage", HostValue::from(usage));
                buffer
            }
            "createTexture" => {
                let format = field(cx, desc, "format");
                let format = format.as_str().unwrap_or_default();
                if GPU_TEXTURE_FORMAT.try_to_guest(format).is_none() {
                    return Err(HostException::type_error(format!(
                        "'{format}' is not a valid enum value of type GPUTextureFormat"
                    ))
                    .into());
                }
                let (width, height, depth) = extent(cx, &field(cx, desc, "size"));
                if width == 0 || height == 0 {
                    self.report(cx, HostException::validation("Texture size must be non-zero"));
                }
                let texture = resource("GPUTexture");
                texture.props.insert("width", HostValue::from(width));
                texture.props.insert("height", HostValue::from(height));
                texture.props.insert("depthOrArrayLayers", HostValue::from(depth));
                texture.props.insert("format", HostValue::from(format));
                texture.props.insert("usage", HostValue::from(field(cx, desc, "usage").to_u32()));
                texture
            }
            "createShaderModule" => {
                if field(cx, desc, "code").as_str().is_none_or(str::is_empty) {
                    self.report(cx, HostException::validation("Shader module has no code"));
                }
                resource("GPUShaderModule")
            }
            "createSampler" => resource("GPUSampler"),
            "createBindGroupLayout" => resource("GPUBindGroupLayout"),
            "createPipelineLayout" => resource("GPUPipelineLayout"),
            "createBindGroup" => resource("GPUBindGroup"),
            "createRenderPipeline" => {
                if field(cx, desc, "vertex").is_nullish() {
                    return Err(HostException::type_error(
                        "Required member vertex is undefined",
                    )
                    .into());
                }
                resource("GPURenderPipeline")
            }
            "createComputePipeline" => resource("GPUComputePipeline"),
            "createQuerySet" => {
                let set = resource("GPUQuerySet");
                set.props.insert("count", HostValue::from(field(cx, desc, "count").to_u32()));
                set
            }
            "createRenderBundleEncoder" => {
                return Ok(HostValue::native(MockEncoder::new("GPURenderBundleEncoder")));
            }
            "createCommandEncoder" => {
                return Ok(HostValue::native(MockEncoder::new("GPUCommandEncoder")));
            }
            _ => return Err(HostException::type_error(format!(
                "GPUDevice.{method} is not a function"
            ))
            .into()),
        };
        Ok(HostValue::native(created))
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn extent(cx: &HostCx, size: &HostValue) -> (u32, u32, u32) {
    match size {
        HostValue::Array(items) => (
            items.get(0).to_u32(),
            items.get(1).to_u32().max(1),
            items.get(2).to_u32().max(1),
        ),
        other => (
            field(cx, other, "width").to_u32(),
            field(cx, other, "height").to_u32().max(1),
            field(cx, other, "depthOrArrayLayers").to_u32().max(1),
        ),
    }
}

impl HostObject for MockDevice {
    fn class_name(&self) -> &str {
        "GPUDevice"
    }

    fn get(&self, cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "queue" => HostValue::Native(self.queue.clone()),
            "lost" => HostValue::Promise(self.lost_promise(cx)),
            "features" => HostValue::native(MockFeatures::new(Vec::<String>::new())),
            "limits" => HostValue::native(MockLimits::default()),
            "label" => HostValue::from(self.state.lock().label.as_str()),
            "onuncapturederror" => self.state.lock().handler.clone(),
            _ => HostValue::Undefined,
        })
    }

    fn set(&self, _cx: &HostCx, name: &str, value: HostValue) -> HostResult<()> {
        let mut state = self.state.lock();
        match name {
            "label" => state.label = value.as_str().unwrap_or_default().to_string(),
            "onuncapturederror" => state.handler = value,
            _ => {}
        }
        Ok(())
    }

    fn call(&self, cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        self.state.lock().calls.push(method.to_string());
        match method {
            "pushErrorScope" => {
                let filter = arg(args, 0).as_str().unwrap_or("validation").to_string();
                self.state.lock().scopes.push(ErrorScope { filter, error: None });
                Ok(HostValue::Undefined)
            }
            "popErrorScope" => Ok(match self.state.lock().scopes.pop() {
                Some(scope) => cx.resolved(scope.error.unwrap_or(HostValue::Null)),
                None => cx.rejected(
                    HostException::operation_error(
                        "popErrorScope called on an empty error scope stack",
                    )
                    .into(),
                ),
            }),
            "destroy" => {
                let first = !std::mem::replace(&mut self.state.lock().destroyed, true);
                if first {
                    self.settle_lost(cx, "destroyed", "Device was destroyed.");
                }
                Ok(HostValue::Undefined)
            }
            _ => self.create(cx, method, &arg(args, 0)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What the loss promise resolves to.
pub struct MockDeviceLostInfo {
    reason: &'static str,
    message: String,
}

impl HostObject for MockDeviceLostInfo {
    fn class_name(&self) -> &str {
        "GPUDeviceLostInfo"
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match name {
            "reason" => HostValue::from(self.reason),
            "message" => HostValue::from(self.message.as_str()),
            _ => HostValue::Undefined,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A created resource: a property bag plus the methods resources share.
pub struct MockResource {
    class: &'static str,
    /// Properties recorded at creation.
    pub props: HostDict,
    destroyed: Mutex<bool>,
}

impl MockResource {
    /// An empty resource of `class`.
    pub fn new(class: &'static str) -> Self {
        Self {
            class,
            props: HostDict::new(),
            destroyed: Mutex::new(false),
        }
    }

    /// Whether `destroy` was called.
    pub fn is_destroyed(&self) -> bool {
        *self.destroyed.lock()
    }
}

impl HostObject for MockResource {
    fn class_name(&self) -> &str {
        self.class
    }

    fn get(&self, _cx: &HostCx, name: &str) -> HostResult<HostValue> {
        Ok(match (name, self.props.get(name)) {
            ("label", HostValue::Undefined) => HostValue::from(""),
            (_, value) => value,
        })
    }

    fn set(&self, _cx: &HostCx, name: &str, value: HostValue) -> HostResult<()> {
        self.props.insert(name, value);
        Ok(())
    }

    fn call(&self, cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match (self.class, method) {
            (_, "destroy") => {
                *self.destroyed.lock() = true;
                Ok(HostValue::Undefined)
            }
            ("GPUTexture", "createView") => {
                if self.is_destroyed() {
                    return Err(HostException::operation_error(
                        "Cannot create a view of a destroyed texture",
                    )
                    .into());
                }
                let view = MockResource::new("GPUTextureView");
                let desc = arg(args, 0);
                for key in ["format", "dimension", "baseMipLevel", "mipLevelCount", "label"] {
                    let value = field(cx, &desc, key);
                    if !value.is_nullish() {
                        view.props.insert(key, value);
                    }
                }
                Ok(HostValue::native(view))
            }
            ("GPURenderPipeline" | "GPUComputePipeline", "getBindGroupLayout") => {
                let layout = MockResource::new("GPUBindGroupLayout");
                layout.props.insert("index", arg(args, 0));
                Ok(HostValue::native(layout))
            }
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

/// Shared command log of an encoder and the passes it begins.
pub type CommandLog = Arc<Mutex<Vec<String>>>;

/// Command, render-pass, compute-pass or bundle encoder.
pub struct MockEncoder {
    class: &'static str,
    log: CommandLog,
    ended: Mutex<bool>,
}

impl MockEncoder {
    /// A top-level encoder.
    pub fn new(class: &'static str) -> Self {
        Self::with_log(class, CommandLog::default())
    }

    fn with_log(class: &'static str, log: CommandLog) -> Self {
        Self {
            class,
            log,
            ended: Mutex::new(false),
        }
    }

    /// Recorded commands.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn record(&self, method: &str, args: &[HostValue]) {
        let rendered: Vec<String> = args.iter().map(HostValue::debug_string).collect();
        self.log.lock().push(format!("{method}({})", rendered.join(", ")));
    }
}

const PASS_COMMANDS: &[&str] = &[
    "setPipeline",
    "setBindGroup",
    "setVertexBuffer",
    "setIndexBuffer",
    "setViewport",
    "setScissorRect",
    "setStencilReference",
    "draw",
    "drawIndexed",
    "drawIndirect",
    "drawIndexedIndirect",
    "dispatchWorkgroups",
    "executeBundles",
];

const ENCODER_COMMANDS: &[&str] = &[
    "copyBufferToBuffer",
    "copyBufferToTexture",
    "copyTextureToBuffer",
    "copyTextureToTexture",
    "clearBuffer",
    "resolveQuerySet",
];

impl HostObject for MockEncoder {
    fn class_name(&self) -> &str {
        self.class
    }

    fn call(&self, _cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        let is_pass = self.class != "GPUCommandEncoder";
        match method {
            "beginRenderPass" | "beginComputePass" if !is_pass => {
                if method == "beginRenderPass" && !arg(args, 0).is_object() {
                    return Err(HostException::type_error(
                        "beginRenderPass requires a descriptor",
                    )
                    .into());
                }
                self.record(method, &[]);
                let class = match method {
                    "beginRenderPass" => "GPURenderPassEncoder",
                    _ => "GPUComputePassEncoder",
                };
                Ok(HostValue::native(MockEncoder::with_log(class, self.log.clone())))
            }
            "setBlendConstant" if is_pass => {
                let color = arg(args, 0);
                if !color.is_object() {
                    return Err(HostException::type_error(
                        "setBlendConstant requires a color",
                    )
                    .into());
                }
                self.record(method, args);
                Ok(HostValue::Undefined)
            }
            "end" if is_pass => {
                *self.ended.lock() = true;
                self.record(method, &[]);
                Ok(HostValue::Undefined)
            }
            "finish" => {
                self.record(method, &[]);
                let buffer = MockResource::new(match self.class {
                    "GPURenderBundleEncoder" => "GPURenderBundle",
                    _ => "GPUCommandBuffer",
                });
                buffer.props.insert("commands", HostValue::from(self.log.lock().len() as u32));
                Ok(HostValue::native(buffer))
            }
            m if (if is_pass { PASS_COMMANDS } else { ENCODER_COMMANDS }).contains(&m) => {
                if *self.ended.lock() {
                    return Err(HostException::operation_error(format!(
                        "{m} called on an ended pass"
                    ))
                    .into());
                }
                self.record(method, args);
                Ok(HostValue::Undefined)
            }
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

/// One recorded buffer write.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferWrite {
    /// Destination offset.
    pub offset: f64,
    /// Bytes written.
    pub data: Vec<u8>,
}

/// Queue recording writes and submissions.
#[derive(Default)]
pub struct MockQueue {
    writes: Mutex<Vec<BufferWrite>>,
    texture_writes: Mutex<Vec<Vec<u8>>>,
    submitted: Mutex<usize>,
}

impl MockQueue {
    /// Buffer writes in order.
    pub fn writes(&self) -> Vec<BufferWrite> {
        self.writes.lock().clone()
    }

    /// Texture uploads in order.
    pub fn texture_writes(&self) -> Vec<Vec<u8>> {
        self.texture_writes.lock().clone()
    }

    /// Command buffers submitted so far.
    pub fn submitted(&self) -> usize {
        *self.submitted.lock()
    }

    fn write_buffer(&self, args: &[HostValue]) -> HostResult<HostValue> {
        let buffer = arg(args, 0);
        let offset = arg(args, 1).to_number();
        let HostValue::Bytes(data) = arg(args, 2) else {
            return Err(HostException::type_error("writeBuffer data must be a typed array").into());
        };
        let data = data.to_vec();
        let start = args.get(3).map_or(0.0, HostValue::to_number) as usize;
        let len = args
            .get(4)
            .map_or(data.len().saturating_sub(start), |v| v.to_number() as usize);
        let Some(slice) = data.get(start..start.saturating_add(len)) else {
            return Err(HostException::operation_error(
                "writeBuffer range exceeds the source data",
            )
            .into());
        };
        let size = buffer
            .downcast::<MockResource>()
            .and_then(|b| b.props.get("size").as_f64());
        if let Some(size) = size {
            if offset + slice.len() as f64 > size {
                return Err(HostException::operation_error(format!(
                    "Write of {} bytes at offset {offset} overruns a buffer of {size} bytes",
                    slice.len()
                ))
                .into());
            }
        }
        self.writes.lock().push(BufferWrite {
            offset,
            data: slice.to_vec(),
        });
        Ok(HostValue::Undefined)
    }
}

impl HostObject for MockQueue {
    fn class_name(&self) -> &str {
        "GPUQueue"
    }

    fn call(&self, cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "writeBuffer" => self.write_buffer(args),
            "writeTexture" => {
                let HostValue::Bytes(data) = arg(args, 1) else {
                    return Err(HostException::type_error(
                        "writeTexture data must be a typed array",
                    )
                    .into());
                };
                self.texture_writes.lock().push(data.to_vec());
                Ok(HostValue::Undefined)
            }
            "copyExternalImageToTexture" => {
                if field(cx, &arg(args, 0), "source").is_nullish() {
                    return Err(HostException::type_error(
                        "copyExternalImageToTexture requires a source",
                    )
                    .into());
                }
                Ok(HostValue::Undefined)
            }
            "submit" => {
                let count = match arg(args, 0) {
                    HostValue::Array(list) => list.len(),
                    _ => return Err(HostException::type_error("submit expects a sequence").into()),
                };
                *self.submitted.lock() += count;
                Ok(HostValue::Undefined)
            }
            "onSubmittedWorkDone" => Ok(cx.spawn(async {
                tokio::task::yield_now().await;
                Ok(HostValue::Undefined)
            })),
            _ => Err(HostException::type_error(format!(
                "GPUQueue.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Canvas presentation context.
pub struct MockCanvasContext {
    size: Arc<Mutex<(u32, u32)>>,
    configuration: Mutex<Option<HostValue>>,
}

impl MockCanvasContext {
    pub(crate) fn new(size: Arc<Mutex<(u32, u32)>>) -> Self {
        Self {
            size,
            configuration: Mutex::new(None),
        }
    }

    /// Whether `configure` succeeded and `unconfigure` has not been called.
    pub fn is_configured(&self) -> bool {
        self.configuration.lock().is_some()
    }
}

impl HostObject for MockCanvasContext {
    fn class_name(&self) -> &str {
        "GPUCanvasContext"
    }

    fn call(&self, cx: &HostCx, method: &str, args: &[HostValue]) -> HostResult<HostValue> {
        match method {
            "configure" => {
                let desc = arg(args, 0);
                if field(cx, &desc, "device").is_nullish()
                    || field(cx, &desc, "format").is_nullish()
                {
                    return Err(HostException::type_error(
                        "configure requires device and format",
                    )
                    .into());
                }
                *self.configuration.lock() = Some(desc);
                Ok(HostValue::Undefined)
            }
            "unconfigure" => {
                *self.configuration.lock() = None;
                Ok(HostValue::Undefined)
            }
            "getCurrentTexture" => {
                let configuration = self.configuration.lock().clone();
                let Some(desc) = configuration else {
                    return Err(HostException::operation_error(
                        "Canvas context is not configured",
                    )
                    .into());
                };
                let (width, height) = *self.size.lock();
                let texture = MockResource::new("GPUTexture");
                texture.props.insert("width", HostValue::from(width));
                texture.props.insert("height", HostValue::from(height));
                texture.props.insert("depthOrArrayLayers", HostValue::from(1u32));
                texture.props.insert("format", field(cx, &desc, "format"));
                Ok(HostValue::native(texture))
            }
            _ => Err(HostException::type_error(format!(
                "GPUCanvasContext.{method} is not a function"
            ))
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Make a sequence value.
pub fn sequence(items: Vec<HostValue>) -> HostValue {
    HostValue::Array(HostArray::from_vec(items))
}
