//! Graphics device imports.

use crate::marshal::{Op, Param as P, Ret as R, Thunk};
use crate::thunk;
use tether_core::enums::gpu::*;

macro_rules! set {
    ($import:literal, $prop:literal, $param:expr) => {
        thunk!($import => Op::Set($prop), [P::Ref, $param] -> R::Void)
    };
}

macro_rules! limit {
    ($import:literal, $prop:literal) => {
        thunk!($import => Op::Get($prop), [P::Ref] -> R::U32)
    };
    ($import:literal, $prop:literal, f64) => {
        thunk!($import => Op::Get($prop), [P::Ref] -> R::F64)
    };
}

/// Thunks for adapters, devices, resources, encoders and queues.
pub static THUNKS: &[Thunk] = &[
    // Acquisition.
    thunk!("__wbg_navigator" => Op::Get("navigator"), [P::Ref] -> R::Ref),
    thunk!("__wbg_gpu" => Op::Get("gpu"), [P::Ref] -> R::Ref),
    thunk!("__wbg_requestAdapter" => Op::Method("requestAdapter"), [P::Ref, P::Ref] -> R::Ref),
    thunk!("__wbg_requestDevice" => Op::Method("requestDevice"), [P::Ref, P::Ref] -> R::Ref),
    thunk!(
        "__wbg_getPreferredCanvasFormat" => Op::Method("getPreferredCanvasFormat"),
        [P::Ref] -> R::Enum(&GPU_TEXTURE_FORMAT)
    ),
    thunk!("__wbg_wgslLanguageFeatures" => Op::Get("wgslLanguageFeatures"), [P::Ref] -> R::Ref),
    thunk!("__wbg_features" => Op::Get("features"), [P::Ref] -> R::Ref),
    thunk!("__wbg_limits" => Op::Get("limits"), [P::Ref] -> R::Ref),
    thunk!("__wbg_has" => Op::Method("has"), [P::Ref, P::Str] -> R::Bool),
    thunk!("__wbg_queue" => Op::Get("queue"), [P::Ref] -> R::Ref),
    // Errors and loss.
    thunk!("__wbg_lost" => Op::Get("lost"), [P::Ref] -> R::Ref),
    thunk!("__wbg_reason" => Op::Get("reason"), [P::Ref] -> R::Enum(&GPU_DEVICE_LOST_REASON)),
    thunk!("__wbg_event_error" => Op::Get("error"), [P::Ref] -> R::Ref),
    thunk!(
        "__wbg_pushErrorScope" => Op::Method("pushErrorScope"),
        [P::Ref, P::Enum(&GPU_ERROR_FILTER)] -> R::Void
    ),
    thunk!("__wbg_popErrorScope" => Op::Method("popErrorScope"), [P::Ref] -> R::Ref),
    thunk!("__wbg_instanceof_GpuAdapter" => Op::InstanceOf("GPUAdapter"), [P::Ref] -> R::Bool),
    thunk!(
        "__wbg_instanceof_GpuCanvasContext" => Op::InstanceOf("GPUCanvasContext"),
        [P::Ref] -> R::Bool
    ),
    thunk!(
        "__wbg_instanceof_GpuDeviceLostInfo" => Op::InstanceOf("GPUDeviceLostInfo"),
        [P::Ref] -> R::Bool
    ),
    thunk!(
        "__wbg_instanceof_GpuOutOfMemoryError" => Op::InstanceOf("GPUOutOfMemoryError"),
        [P::Ref] -> R::Bool
    ),
    thunk!(
        "__wbg_instanceof_GpuValidationError" => Op::InstanceOf("GPUValidationError"),
        [P::Ref] -> R::Bool
    ),
    // Limits.
    limit!("__wbg_maxTextureDimension1D", "maxTextureDimension1D"),
    limit!("__wbg_maxTextureDimension2D", "maxTextureDimension2D"),
    limit!("__wbg_maxTextureDimension3D", "maxTextureDimension3D"),
    limit!("__wbg_maxTextureArrayLayers", "maxTextureArrayLayers"),
    limit!("__wbg_maxBindGroups", "maxBindGroups"),
    limit!("__wbg_maxBindingsPerBindGroup", "maxBindingsPerBindGroup"),
    limit!(
        "__wbg_maxDynamicUniformBuffersPerPipelineLayout",
        "maxDynamicUniformBuffersPerPipelineLayout"
    ),
    limit!(
        "__wbg_maxDynamicStorageBuffersPerPipelineLayout",
        "maxDynamicStorageBuffersPerPipelineLayout"
    ),
    limit!("__wbg_maxSampledTexturesPerShaderStage", "maxSampledTexturesPerShaderStage"),
    limit!("__wbg_maxSamplersPerShaderStage", "maxSamplersPerShaderStage"),
    limit!("__wbg_maxStorageBuffersPerShaderStage", "maxStorageBuffersPerShaderStage"),
    limit!("__wbg_maxStorageTexturesPerShaderStage", "maxStorageTexturesPerShaderStage"),
    limit!("__wbg_maxUniformBuffersPerShaderStage", "maxUniformBuffersPerShaderStage"),
    limit!("__wbg_maxUniformBufferBindingSize", "maxUniformBufferBindingSize", f64),
    limit!("__wbg_maxStorageBufferBindingSize", "maxStorageBufferBindingSize", f64),
    limit!("__wbg_maxBufferSize", "maxBufferSize", f64),
    limit!("__wbg_minUniformBufferOffsetAlignment", "minUniformBufferOffsetAlignment"),
    limit!("__wbg_minStorageBufferOffsetAlignment", "minStorageBufferOffsetAlignment"),
    limit!("__wbg_maxVertexBuffers", "maxVertexBuffers"),
    limit!("__wbg_maxVertexAttributes", "maxVertexAttributes"),
    limit!("__wbg_maxVertexBufferArrayStride", "maxVertexBufferArrayStride"),
    limit!("__wbg_maxColorAttachments", "maxColorAttachments"),
    limit!("__wbg_maxColorAttachmentBytesPerSample", "maxColorAttachmentBytesPerSample"),
    limit!("__wbg_maxComputeWorkgroupStorageSize", "maxComputeWorkgroupStorageSize"),
    limit!("__wbg_maxComputeInvocationsPerWorkgroup", "maxComputeInvocationsPerWorkgroup"),
    limit!("__wbg_maxComputeWorkgroupSizeX", "maxComputeWorkgroupSizeX"),
    limit!("__wbg_maxComputeWorkgroupSizeY", "maxComputeWorkgroupSizeY"),
    limit!("__wbg_maxComputeWorkgroupSizeZ", "maxComputeWorkgroupSizeZ"),
    limit!("__wbg_maxComputeWorkgroupsPerDimension", "maxComputeWorkgroupsPerDimension"),
    // Resource creation. Descriptor errors surface through error scopes;
    // the catching variants also cover synchronous throws.
    thunk!("__wbg_createBuffer" => Op::Method("createBuffer"), [P::Ref, P::Ref] -> R::Ref, catch),
    thunk!("__wbg_createTexture" => Op::Method("createTexture"), [P::Ref, P::Ref] -> R::Ref, catch),
    thunk!("__wbg_createView" => Op::Method("createView"), [P::Ref, P::Ref] -> R::Ref, catch),
    thunk!("__wbg_createSampler" => Op::Method("createSampler"), [P::Ref, P::Ref] -> R::Ref),
    thunk!(
        "__wbg_createShaderModule" => Op::Method("createShaderModule"),
        [P::Ref, P::Ref] -> R::Ref
    ),
    thunk!(
        "__wbg_createBindGroupLayout" => Op::Method("createBindGroupLayout"),
        [P::Ref, P::Ref] -> R::Ref, catch
    ),
    thunk!(
        "__wbg_createPipelineLayout" => Op::Method("createPipelineLayout"),
        [P::Ref, P::Ref] -> R::Ref
    ),
    thunk!("__wbg_createBindGroup" => Op::Method("createBindGroup"), [P::Ref, P::Ref] -> R::Ref),
    thunk!(
        "__wbg_createRenderPipeline" => Op::Method("createRenderPipeline"),
        [P::Ref, P::Ref] -> R::Ref, catch
    ),
    thunk!(
        "__wbg_createComputePipeline" => Op::Method("createComputePipeline"),
        [P::Ref, P::Ref] -> R::Ref
    ),
    thunk!(
        "__wbg_createCommandEncoder" => Op::Method("createCommandEncoder"),
        [P::Ref, P::Ref] -> R::Ref
    ),
    thunk!(
        "__wbg_createQuerySet" => Op::Method("createQuerySet"),
        [P::Ref, P::Ref] -> R::Ref, catch
    ),
    thunk!(
        "__wbg_createRenderBundleEncoder" => Op::Method("createRenderBundleEncoder"),
        [P::Ref, P::Ref] -> R::Ref, catch
    ),
    thunk!("__wbg_destroy" => Op::Method("destroy"), [P::Ref] -> R::Void),
    thunk!("__wbg_size" => Op::Get("size"), [P::Ref] -> R::F64),
    thunk!("__wbg_usage" => Op::Get("usage"), [P::Ref] -> R::U32),
    thunk!("__wbg_width" => Op::Get("width"), [P::Ref] -> R::U32),
    thunk!("__wbg_height" => Op::Get("height"), [P::Ref] -> R::U32),
    thunk!("__wbg_label" => Op::Get("label"), [P::Ref] -> R::StrOut),
    // Command encoding.
    thunk!(
        "__wbg_beginRenderPass" => Op::Method("beginRenderPass"),
        [P::Ref, P::Ref] -> R::Ref, catch
    ),
    thunk!("__wbg_beginComputePass" => Op::Method("beginComputePass"), [P::Ref, P::Ref] -> R::Ref),
    thunk!("__wbg_finish" => Op::Method("finish"), [P::Ref] -> R::Ref),
    thunk!("__wbg_finish_with_descriptor" => Op::Method("finish"), [P::Ref, P::Ref] -> R::Ref),
    thunk!("__wbg_end" => Op::Method("end"), [P::Ref] -> R::Void),
    thunk!("__wbg_setPipeline" => Op::Method("setPipeline"), [P::Ref, P::Ref] -> R::Void),
    thunk!("__wbg_setBindGroup" => Op::Method("setBindGroup"), [P::Ref, P::U32, P::Ref] -> R::Void),
    thunk!(
        "__wbg_setBindGroup_with_offsets" => Op::Method("setBindGroup"),
        [P::Ref, P::U32, P::Ref, P::U32Span, P::F64, P::U32] -> R::Void, catch
    ),
    thunk!(
        "__wbg_setVertexBuffer" => Op::Method("setVertexBuffer"),
        [P::Ref, P::U32, P::Ref, P::F64, P::F64] -> R::Void
    ),
    thunk!(
        "__wbg_setVertexBuffer_with_offset" => Op::Method("setVertexBuffer"),
        [P::Ref, P::U32, P::Ref, P::F64] -> R::Void
    ),
    thunk!(
        "__wbg_setIndexBuffer" => Op::Method("setIndexBuffer"),
        [P::Ref, P::Ref, P::Enum(&GPU_INDEX_FORMAT), P::F64, P::F64] -> R::Void
    ),
    thunk!(
        "__wbg_setIndexBuffer_with_offset" => Op::Method("setIndexBuffer"),
        [P::Ref, P::Ref, P::Enum(&GPU_INDEX_FORMAT), P::F64] -> R::Void
    ),
    thunk!(
        "__wbg_setViewport" => Op::Method("setViewport"),
        [P::Ref, P::F32, P::F32, P::F32, P::F32, P::F32, P::F32] -> R::Void
    ),
    thunk!(
        "__wbg_setScissorRect" => Op::Method("setScissorRect"),
        [P::Ref, P::U32, P::U32, P::U32, P::U32] -> R::Void
    ),
    thunk!(
        "__wbg_setBlendConstant" => Op::Method("setBlendConstant"),
        [P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!(
        "__wbg_setStencilReference" => Op::Method("setStencilReference"),
        [P::Ref, P::U32] -> R::Void
    ),
    thunk!("__wbg_draw" => Op::Method("draw"), [P::Ref, P::U32, P::U32, P::U32, P::U32] -> R::Void),
    thunk!(
        "__wbg_drawIndexed" => Op::Method("drawIndexed"),
        [P::Ref, P::U32, P::U32, P::U32, P::I32, P::U32] -> R::Void
    ),
    thunk!("__wbg_drawIndirect" => Op::Method("drawIndirect"), [P::Ref, P::Ref, P::F64] -> R::Void),
    thunk!(
        "__wbg_drawIndexedIndirect" => Op::Method("drawIndexedIndirect"),
        [P::Ref, P::Ref, P::F64] -> R::Void
    ),
    thunk!(
        "__wbg_dispatchWorkgroups" => Op::Method("dispatchWorkgroups"),
        [P::Ref, P::U32, P::U32, P::U32] -> R::Void
    ),
    thunk!("__wbg_executeBundles" => Op::Method("executeBundles"), [P::Ref, P::Ref] -> R::Void),
    thunk!("__wbg_clearBuffer" => Op::Method("clearBuffer"), [P::Ref, P::Ref, P::F64] -> R::Void),
    thunk!(
        "__wbg_clearBuffer_with_size" => Op::Method("clearBuffer"),
        [P::Ref, P::Ref, P::F64, P::F64] -> R::Void
    ),
    thunk!(
        "__wbg_copyBufferToBuffer" => Op::Method("copyBufferToBuffer"),
        [P::Ref, P::Ref, P::F64, P::Ref, P::F64, P::F64] -> R::Void, catch
    ),
    thunk!(
        "__wbg_copyBufferToTexture" => Op::Method("copyBufferToTexture"),
        [P::Ref, P::Ref, P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!(
        "__wbg_copyTextureToBuffer" => Op::Method("copyTextureToBuffer"),
        [P::Ref, P::Ref, P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!(
        "__wbg_copyTextureToTexture" => Op::Method("copyTextureToTexture"),
        [P::Ref, P::Ref, P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!(
        "__wbg_resolveQuerySet" => Op::Method("resolveQuerySet"),
        [P::Ref, P::Ref, P::U32, P::U32, P::Ref, P::U32] -> R::Void
    ),
    // Queue and presentation.
    thunk!(
        "__wbg_writeBuffer" => Op::Method("writeBuffer"),
        [P::Ref, P::Ref, P::F64, P::Ref, P::F64, P::F64] -> R::Void, catch
    ),
    thunk!(
        "__wbg_writeBuffer_span" => Op::Method("writeBuffer"),
        [P::Ref, P::Ref, P::F64, P::U8Span] -> R::Void, catch
    ),
    thunk!(
        "__wbg_writeTexture" => Op::Method("writeTexture"),
        [P::Ref, P::Ref, P::Ref, P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!(
        "__wbg_writeTexture_span" => Op::Method("writeTexture"),
        [P::Ref, P::Ref, P::U8Span, P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!(
        "__wbg_copyExternalImageToTexture" => Op::Method("copyExternalImageToTexture"),
        [P::Ref, P::Ref, P::Ref, P::Ref] -> R::Void, catch
    ),
    thunk!("__wbg_submit" => Op::Method("submit"), [P::Ref, P::Ref] -> R::Void),
    thunk!("__wbg_onSubmittedWorkDone" => Op::Method("onSubmittedWorkDone"), [P::Ref] -> R::Ref),
    thunk!("__wbg_configure" => Op::Method("configure"), [P::Ref, P::Ref] -> R::Void, catch),
    thunk!("__wbg_unconfigure" => Op::Method("unconfigure"), [P::Ref] -> R::Void),
    thunk!("__wbg_getCurrentTexture" => Op::Method("getCurrentTexture"), [P::Ref] -> R::Ref, catch),
    // Descriptor fields holding objects.
    set!("__wbg_setalpha", "alpha", P::Ref),
    set!("__wbg_setattributes", "attributes", P::Ref),
    set!("__wbg_setbindgrouplayouts", "bindGroupLayouts", P::Ref),
    set!("__wbg_setblend", "blend", P::Ref),
    set!("__wbg_setbuffer", "buffer", P::Ref),
    set!("__wbg_setbuffers", "buffers", P::Ref),
    set!("__wbg_setclearvalue", "clearValue", P::Ref),
    set!("__wbg_setcolor", "color", P::Ref),
    set!("__wbg_setcolorattachments", "colorAttachments", P::Ref),
    set!("__wbg_setcolorformats", "colorFormats", P::Ref),
    set!("__wbg_setcompute", "compute", P::Ref),
    set!("__wbg_setdepthstencil", "depthStencil", P::Ref),
    set!("__wbg_setdepthstencilattachment", "depthStencilAttachment", P::Ref),
    set!("__wbg_setdevice", "device", P::Ref),
    set!("__wbg_setentries", "entries", P::Ref),
    set!("__wbg_setfragment", "fragment", P::Ref),
    set!("__wbg_setlayout", "layout", P::Ref),
    set!("__wbg_setmodule", "module", P::Ref),
    set!("__wbg_setmultisample", "multisample", P::Ref),
    set!("__wbg_setonuncapturederror", "onuncapturederror", P::Ref),
    set!("__wbg_setorigin", "origin", P::Ref),
    set!("__wbg_setprimitive", "primitive", P::Ref),
    set!("__wbg_setqueryset", "querySet", P::Ref),
    set!("__wbg_setrequiredfeatures", "requiredFeatures", P::Ref),
    set!("__wbg_setrequiredlimits", "requiredLimits", P::Ref),
    set!("__wbg_setresolvetarget", "resolveTarget", P::Ref),
    set!("__wbg_setresource", "resource", P::Ref),
    set!("__wbg_setsampler", "sampler", P::Ref),
    set!("__wbg_setsource", "source", P::Ref),
    set!("__wbg_setstencilback", "stencilBack", P::Ref),
    set!("__wbg_setstencilfront", "stencilFront", P::Ref),
    set!("__wbg_setstoragetexture", "storageTexture", P::Ref),
    set!("__wbg_settargets", "targets", P::Ref),
    set!("__wbg_settexture", "texture", P::Ref),
    set!("__wbg_settimestampwrites", "timestampWrites", P::Ref),
    set!("__wbg_setvertex", "vertex", P::Ref),
    set!("__wbg_setview", "view", P::Ref),
    set!("__wbg_setviewformats", "viewFormats", P::Ref),
    // Integer fields.
    set!("__wbg_setarraylayercount", "arrayLayerCount", P::U32),
    set!("__wbg_setbasearraylayer", "baseArrayLayer", P::U32),
    set!("__wbg_setbasemiplevel", "baseMipLevel", P::U32),
    set!("__wbg_setbeginningofpasswriteindex", "beginningOfPassWriteIndex", P::U32),
    set!("__wbg_setbinding", "binding", P::U32),
    set!("__wbg_setbytesperrow", "bytesPerRow", P::U32),
    set!("__wbg_setcount", "count", P::U32),
    set!("__wbg_setdepthorarraylayers", "depthOrArrayLayers", P::U32),
    set!("__wbg_setendofpasswriteindex", "endOfPassWriteIndex", P::U32),
    set!("__wbg_setheight", "height", P::U32),
    set!("__wbg_setmask", "mask", P::U32),
    set!("__wbg_setmiplevel", "mipLevel", P::U32),
    set!("__wbg_setmiplevelcount", "mipLevelCount", P::U32),
    set!("__wbg_setrowsperimage", "rowsPerImage", P::U32),
    set!("__wbg_setsamplecount", "sampleCount", P::U32),
    set!("__wbg_setshaderlocation", "shaderLocation", P::U32),
    set!("__wbg_setstencilclearvalue", "stencilClearValue", P::U32),
    set!("__wbg_setstencilreadmask", "stencilReadMask", P::U32),
    set!("__wbg_setstencilwritemask", "stencilWriteMask", P::U32),
    set!("__wbg_setusage", "usage", P::U32),
    set!("__wbg_setvisibility", "visibility", P::U32),
    set!("__wbg_setwidth", "width", P::U32),
    set!("__wbg_setwritemask", "writeMask", P::U32),
    set!("__wbg_setx", "x", P::U32),
    set!("__wbg_sety", "y", P::U32),
    set!("__wbg_setz", "z", P::U32),
    set!("__wbg_setdepthbias", "depthBias", P::I32),
    set!("__wbg_setmaxanisotropy", "maxAnisotropy", P::I32),
    // Floating point fields.
    set!("__wbg_seta", "a", P::F64),
    set!("__wbg_setr", "r", P::F64),
    set!("__wbg_setg", "g", P::F64),
    set!("__wbg_setb", "b", P::F64),
    set!("__wbg_setarraystride", "arrayStride", P::F64),
    set!("__wbg_setminbindingsize", "minBindingSize", P::F64),
    set!("__wbg_setoffset", "offset", P::F64),
    set!("__wbg_setsize", "size", P::F64),
    set!("__wbg_setdepthbiasclamp", "depthBiasClamp", P::F32),
    set!("__wbg_setdepthbiasslopescale", "depthBiasSlopeScale", P::F32),
    set!("__wbg_setdepthclearvalue", "depthClearValue", P::F32),
    set!("__wbg_setlodmaxclamp", "lodMaxClamp", P::F32),
    set!("__wbg_setlodminclamp", "lodMinClamp", P::F32),
    // Boolean fields.
    set!("__wbg_setalphatocoverageenabled", "alphaToCoverageEnabled", P::Bool),
    set!("__wbg_setdepthreadonly", "depthReadOnly", P::Bool),
    set!("__wbg_setdepthwriteenabled", "depthWriteEnabled", P::Bool),
    set!("__wbg_setflipy", "flipY", P::Bool),
    set!("__wbg_sethasdynamicoffset", "hasDynamicOffset", P::Bool),
    set!("__wbg_setmappedatcreation", "mappedAtCreation", P::Bool),
    set!("__wbg_setmultisampled", "multisampled", P::Bool),
    set!("__wbg_setpremultipliedalpha", "premultipliedAlpha", P::Bool),
    set!("__wbg_setstencilreadonly", "stencilReadOnly", P::Bool),
    // String fields.
    thunk!("__wbg_setcode" => Op::Set("code"), [P::Ref, P::Str] -> R::Void),
    thunk!("__wbg_setentrypoint" => Op::Set("entryPoint"), [P::Ref, P::Str] -> R::Void),
    thunk!("__wbg_setlabel" => Op::Set("label"), [P::Ref, P::Str] -> R::Void),
    // Enum fields.
    set!("__wbg_setaccess", "access", P::Enum(&GPU_STORAGE_TEXTURE_ACCESS)),
    set!("__wbg_setaddressmodeu", "addressModeU", P::Enum(&GPU_ADDRESS_MODE)),
    set!("__wbg_setaddressmodev", "addressModeV", P::Enum(&GPU_ADDRESS_MODE)),
    set!("__wbg_setaddressmodew", "addressModeW", P::Enum(&GPU_ADDRESS_MODE)),
    set!("__wbg_setalphamode", "alphaMode", P::Enum(&GPU_CANVAS_ALPHA_MODE)),
    set!("__wbg_setaspect", "aspect", P::Enum(&GPU_TEXTURE_ASPECT)),
    set!("__wbg_setcompare", "compare", P::Enum(&GPU_COMPARE_FUNCTION)),
    set!("__wbg_setcullmode", "cullMode", P::Enum(&GPU_CULL_MODE)),
    set!("__wbg_setdepthcompare", "depthCompare", P::Enum(&GPU_COMPARE_FUNCTION)),
    set!("__wbg_setdepthfailop", "depthFailOp", P::Enum(&GPU_STENCIL_OPERATION)),
    set!("__wbg_setdepthloadop", "depthLoadOp", P::Enum(&GPU_LOAD_OP)),
    set!("__wbg_setdepthstencilformat", "depthStencilFormat", P::Enum(&GPU_TEXTURE_FORMAT)),
    set!("__wbg_setdepthstoreop", "depthStoreOp", P::Enum(&GPU_STORE_OP)),
    set!("__wbg_setdimension_texture", "dimension", P::Enum(&GPU_TEXTURE_DIMENSION)),
    set!("__wbg_setdimension_view", "dimension", P::Enum(&GPU_TEXTURE_VIEW_DIMENSION)),
    set!("__wbg_setdstfactor", "dstFactor", P::Enum(&GPU_BLEND_FACTOR)),
    set!("__wbg_setfailop", "failOp", P::Enum(&GPU_STENCIL_OPERATION)),
    set!("__wbg_setformat_texture", "format", P::Enum(&GPU_TEXTURE_FORMAT)),
    set!("__wbg_setformat_vertex", "format", P::Enum(&GPU_VERTEX_FORMAT)),
    set!("__wbg_setfrontface", "frontFace", P::Enum(&GPU_FRONT_FACE)),
    set!("__wbg_setloadop", "loadOp", P::Enum(&GPU_LOAD_OP)),
    set!("__wbg_setmagfilter", "magFilter", P::Enum(&GPU_FILTER_MODE)),
    set!("__wbg_setminfilter", "minFilter", P::Enum(&GPU_FILTER_MODE)),
    set!("__wbg_setmipmapfilter", "mipmapFilter", P::Enum(&GPU_MIPMAP_FILTER_MODE)),
    set!("__wbg_setoperation", "operation", P::Enum(&GPU_BLEND_OPERATION)),
    set!("__wbg_setpassop", "passOp", P::Enum(&GPU_STENCIL_OPERATION)),
    set!("__wbg_setpowerpreference", "powerPreference", P::Enum(&GPU_POWER_PREFERENCE)),
    set!("__wbg_setsampletype", "sampleType", P::Enum(&GPU_TEXTURE_SAMPLE_TYPE)),
    set!("__wbg_setsrcfactor", "srcFactor", P::Enum(&GPU_BLEND_FACTOR)),
    set!("__wbg_setstencilloadop", "stencilLoadOp", P::Enum(&GPU_LOAD_OP)),
    set!("__wbg_setstencilstoreop", "stencilStoreOp", P::Enum(&GPU_STORE_OP)),
    set!("__wbg_setstepmode", "stepMode", P::Enum(&GPU_VERTEX_STEP_MODE)),
    set!("__wbg_setstoreop", "storeOp", P::Enum(&GPU_STORE_OP)),
    set!("__wbg_setstripindexformat", "stripIndexFormat", P::Enum(&GPU_INDEX_FORMAT)),
    set!("__wbg_settopology", "topology", P::Enum(&GPU_PRIMITIVE_TOPOLOGY)),
    set!("__wbg_settype_buffer", "type", P::Enum(&GPU_BUFFER_BINDING_TYPE)),
    set!("__wbg_settype_query", "type", P::Enum(&GPU_QUERY_TYPE)),
    set!("__wbg_settype_sampler", "type", P::Enum(&GPU_SAMPLER_BINDING_TYPE)),
    set!("__wbg_setviewdimension", "viewDimension", P::Enum(&GPU_TEXTURE_VIEW_DIMENSION)),
];
