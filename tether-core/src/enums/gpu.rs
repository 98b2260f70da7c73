//! Positional tables for the graphics API's string enumerations.
//!
//! Order is the contract: the guest was compiled with these exact indices.
//! Append-only changes on the host side are absorbed by the unknown
//! sentinel; reordering breaks every guest built against the old order.

use super::EnumTable;

/// `GpuAddressMode` (3 values).
pub static GPU_ADDRESS_MODE: EnumTable = EnumTable::new(
    "GpuAddressMode",
    &[
        "clamp-to-edge", "repeat", "mirror-repeat",
    ],
);

/// `GpuBlendFactor` (17 values).
pub static GPU_BLEND_FACTOR: EnumTable = EnumTable::new(
    "GpuBlendFactor",
    &[
        "zero", "one", "src", "one-minus-src", "src-alpha", "one-minus-src-alpha", "dst",
        "one-minus-dst", "dst-alpha", "one-minus-dst-alpha", "src-alpha-saturated", "constant",
        "one-minus-constant", "src1", "one-minus-src1", "src1-alpha", "one-minus-src1-alpha",
    ],
);

/// `GpuBlendOperation` (5 values).
pub static GPU_BLEND_OPERATION: EnumTable = EnumTable::new(
    "GpuBlendOperation",
    &[
        "add", "subtract", "reverse-subtract", "min", "max",
    ],
);

/// `GpuBufferBindingType` (3 values).
pub static GPU_BUFFER_BINDING_TYPE: EnumTable = EnumTable::new(
    "GpuBufferBindingType",
    &[
        "uniform", "storage", "read-only-storage",
    ],
);

/// `GpuCanvasAlphaMode` (2 values).
pub static GPU_CANVAS_ALPHA_MODE: EnumTable = EnumTable::new(
    "GpuCanvasAlphaMode",
    &[
        "opaque", "premultiplied",
    ],
);

/// `GpuCompareFunction` (8 values).
pub static GPU_COMPARE_FUNCTION: EnumTable = EnumTable::new(
    "GpuCompareFunction",
    &[
        "never", "less", "equal", "less-equal", "greater", "not-equal", "greater-equal", "always",
    ],
);

/// `GpuCullMode` (3 values).
pub static GPU_CULL_MODE: EnumTable = EnumTable::new(
    "GpuCullMode",
    &[
        "none", "front", "back",
    ],
);

/// `GpuDeviceLostReason` (2 values).
pub static GPU_DEVICE_LOST_REASON: EnumTable = EnumTable::new(
    "GpuDeviceLostReason",
    &[
        "unknown", "destroyed",
    ],
);

/// `GpuErrorFilter` (3 values).
pub static GPU_ERROR_FILTER: EnumTable = EnumTable::new(
    "GpuErrorFilter",
    &[
        "validation", "out-of-memory", "internal",
    ],
);

/// `GpuFilterMode` (2 values).
pub static GPU_FILTER_MODE: EnumTable = EnumTable::new(
    "GpuFilterMode",
    &[
        "nearest", "linear",
    ],
);

/// `GpuFrontFace` (2 values).
pub static GPU_FRONT_FACE: EnumTable = EnumTable::new(
    "GpuFrontFace",
    &[
        "ccw", "cw",
    ],
);

/// `GpuIndexFormat` (2 values).
pub static GPU_INDEX_FORMAT: EnumTable = EnumTable::new(
    "GpuIndexFormat",
    &[
        "uint16", "uint32",
    ],
);

/// `GpuLoadOp` (2 values).
pub static GPU_LOAD_OP: EnumTable = EnumTable::new(
    "GpuLoadOp",
    &[
        "load", "clear",
    ],
);

/// `GpuMipmapFilterMode` (2 values).
pub static GPU_MIPMAP_FILTER_MODE: EnumTable = EnumTable::new(
    "GpuMipmapFilterMode",
    &[
        "nearest", "linear",
    ],
);

/// `GpuPowerPreference` (2 values).
pub static GPU_POWER_PREFERENCE: EnumTable = EnumTable::new(
    "GpuPowerPreference",
    &[
        "low-power", "high-performance",
    ],
);

/// `GpuPrimitiveTopology` (5 values).
pub static GPU_PRIMITIVE_TOPOLOGY: EnumTable = EnumTable::new(
    "GpuPrimitiveTopology",
    &[
        "point-list", "line-list", "line-strip", "triangle-list", "triangle-strip",
    ],
);

/// `GpuQueryType` (2 values).
pub static GPU_QUERY_TYPE: EnumTable = EnumTable::new(
    "GpuQueryType",
    &[
        "occlusion", "timestamp",
    ],
);

/// `GpuSamplerBindingType` (3 values).
pub static GPU_SAMPLER_BINDING_TYPE: EnumTable = EnumTable::new(
    "GpuSamplerBindingType",
    &[
        "filtering", "non-filtering", "comparison",
    ],
);

/// `GpuStencilOperation` (8 values).
pub static GPU_STENCIL_OPERATION: EnumTable = EnumTable::new(
    "GpuStencilOperation",
    &[
        "keep", "zero", "replace", "invert", "increment-clamp", "decrement-clamp", "increment-wrap",
        "decrement-wrap",
    ],
);

/// `GpuStorageTextureAccess` (3 values).
pub static GPU_STORAGE_TEXTURE_ACCESS: EnumTable = EnumTable::new(
    "GpuStorageTextureAccess",
    &[
        "write-only", "read-only", "read-write",
    ],
);

/// `GpuStoreOp` (2 values).
pub static GPU_STORE_OP: EnumTable = EnumTable::new(
    "GpuStoreOp",
    &[
        "store", "discard",
    ],
);

/// `GpuTextureAspect` (3 values).
pub static GPU_TEXTURE_ASPECT: EnumTable = EnumTable::new(
    "GpuTextureAspect",
    &[
        "all", "stencil-only", "depth-only",
    ],
);

/// `GpuTextureDimension` (3 values).
pub static GPU_TEXTURE_DIMENSION: EnumTable = EnumTable::new(
    "GpuTextureDimension",
    &[
        "1d", "2d", "3d",
    ],
);

/// `GpuTextureFormat` (95 values).
pub static GPU_TEXTURE_FORMAT: EnumTable = EnumTable::new(
    "GpuTextureFormat",
    &[
        "r8unorm", "r8snorm", "r8uint", "r8sint", "r16uint", "r16sint", "r16float", "rg8unorm",
        "rg8snorm", "rg8uint", "rg8sint", "r32uint", "r32sint", "r32float", "rg16uint", "rg16sint",
        "rg16float", "rgba8unorm", "rgba8unorm-srgb", "rgba8snorm", "rgba8uint", "rgba8sint",
        "bgra8unorm", "bgra8unorm-srgb", "rgb9e5ufloat", "rgb10a2uint", "rgb10a2unorm",
        "rg11b10ufloat", "rg32uint", "rg32sint", "rg32float", "rgba16uint", "rgba16sint",
        "rgba16float", "rgba32uint", "rgba32sint", "rgba32float", "stencil8", "depth16unorm",
        "depth24plus", "depth24plus-stencil8", "depth32float", "depth32float-stencil8",
        "bc1-rgba-unorm", "bc1-rgba-unorm-srgb", "bc2-rgba-unorm", "bc2-rgba-unorm-srgb",
        "bc3-rgba-unorm", "bc3-rgba-unorm-srgb", "bc4-r-unorm", "bc4-r-snorm", "bc5-rg-unorm",
        "bc5-rg-snorm", "bc6h-rgb-ufloat", "bc6h-rgb-float", "bc7-rgba-unorm",
        "bc7-rgba-unorm-srgb", "etc2-rgb8unorm", "etc2-rgb8unorm-srgb", "etc2-rgb8a1unorm",
        "etc2-rgb8a1unorm-srgb", "etc2-rgba8unorm", "etc2-rgba8unorm-srgb", "eac-r11unorm",
        "eac-r11snorm", "eac-rg11unorm", "eac-rg11snorm", "astc-4x4-unorm", "astc-4x4-unorm-srgb",
        "astc-5x4-unorm", "astc-5x4-unorm-srgb", "astc-5x5-unorm", "astc-5x5-unorm-srgb",
        "astc-6x5-unorm", "astc-6x5-unorm-srgb", "astc-6x6-unorm", "astc-6x6-unorm-srgb",
        "astc-8x5-unorm", "astc-8x5-unorm-srgb", "astc-8x6-unorm", "astc-8x6-unorm-srgb",
        "astc-8x8-unorm", "astc-8x8-unorm-srgb", "astc-10x5-unorm", "astc-10x5-unorm-srgb",
        "astc-10x6-unorm", "astc-10x6-unorm-srgb", "astc-10x8-unorm", "astc-10x8-unorm-srgb",
        "astc-10x10-unorm", "astc-10x10-unorm-srgb", "astc-12x10-unorm", "astc-12x10-unorm-srgb",
        "astc-12x12-unorm", "astc-12x12-unorm-srgb",
    ],
);

/// `GpuTextureSampleType` (5 values).
pub static GPU_TEXTURE_SAMPLE_TYPE: EnumTable = EnumTable::new(
    "GpuTextureSampleType",
    &[
        "float", "unfilterable-float", "depth", "sint", "uint",
    ],
);

/// `GpuTextureViewDimension` (6 values).
pub static GPU_TEXTURE_VIEW_DIMENSION: EnumTable = EnumTable::new(
    "GpuTextureViewDimension",
    &[
        "1d", "2d", "2d-array", "cube", "cube-array", "3d",
    ],
);

/// `GpuVertexFormat` (41 values).
pub static GPU_VERTEX_FORMAT: EnumTable = EnumTable::new(
    "GpuVertexFormat",
    &[
        "uint8", "uint8x2", "uint8x4", "sint8", "sint8x2", "sint8x4", "unorm8", "unorm8x2",
        "unorm8x4", "snorm8", "snorm8x2", "snorm8x4", "uint16", "uint16x2", "uint16x4", "sint16",
        "sint16x2", "sint16x4", "unorm16", "unorm16x2", "unorm16x4", "snorm16", "snorm16x2",
        "snorm16x4", "float16", "float16x2", "float16x4", "float32", "float32x2", "float32x3",
        "float32x4", "uint32", "uint32x2", "uint32x3", "uint32x4", "sint32", "sint32x2", "sint32x3",
        "sint32x4", "unorm10-10-10-2", "unorm8x4-bgra",
    ],
);

/// `GpuVertexStepMode` (2 values).
pub static GPU_VERTEX_STEP_MODE: EnumTable = EnumTable::new(
    "GpuVertexStepMode",
    &[
        "vertex", "instance",
    ],
);

/// Every graphics enumeration, for lookup by name.
pub static ALL: &[&EnumTable] = &[
    &GPU_ADDRESS_MODE,
    &GPU_BLEND_FACTOR,
    &GPU_BLEND_OPERATION,
    &GPU_BUFFER_BINDING_TYPE,
    &GPU_CANVAS_ALPHA_MODE,
    &GPU_COMPARE_FUNCTION,
    &GPU_CULL_MODE,
    &GPU_DEVICE_LOST_REASON,
    &GPU_ERROR_FILTER,
    &GPU_FILTER_MODE,
    &GPU_FRONT_FACE,
    &GPU_INDEX_FORMAT,
    &GPU_LOAD_OP,
    &GPU_MIPMAP_FILTER_MODE,
    &GPU_POWER_PREFERENCE,
    &GPU_PRIMITIVE_TOPOLOGY,
    &GPU_QUERY_TYPE,
    &GPU_SAMPLER_BINDING_TYPE,
    &GPU_STENCIL_OPERATION,
    &GPU_STORAGE_TEXTURE_ACCESS,
    &GPU_STORE_OP,
    &GPU_TEXTURE_ASPECT,
    &GPU_TEXTURE_DIMENSION,
    &GPU_TEXTURE_FORMAT,
    &GPU_TEXTURE_SAMPLE_TYPE,
    &GPU_TEXTURE_VIEW_DIMENSION,
    &GPU_VERTEX_FORMAT,
    &GPU_VERTEX_STEP_MODE,
];
