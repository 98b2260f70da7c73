//! Error types for the bridge.
//!
//! Every variant carries a stable code so logs and guest-facing diagnostics
//! can be matched without parsing prose. Codes are grouped by the component
//! that raises them.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for bridge operations.
///
/// These are bridge-level faults. A value thrown by a host API is not a
/// `BridgeError`; it travels as a [`HostValue`](crate::HostValue) through
/// the exception slot until nobody catches it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    // =========================================================================
    // Linear Memory and Codec Errors (E101-E199)
    // =========================================================================
    /// A view access fell outside the current linear memory bounds.
    #[error("E101: Memory access out of bounds: offset {offset} len {len} exceeds size {size}")]
    OutOfBounds {
        /// Byte offset of the access.
        offset: u64,
        /// Length of the access in bytes.
        len: u64,
        /// Byte length of the linear memory at the time of the access.
        size: u64,
    },

    /// A text span handed across the boundary was not well-formed UTF-8.
    #[error("E102: Invalid UTF-8 at {ptr}+{len}: valid up to byte {valid_up_to}")]
    InvalidUtf8 {
        /// Guest pointer of the span.
        ptr: u32,
        /// Length of the span.
        len: u32,
        /// Number of leading bytes that decoded cleanly.
        valid_up_to: usize,
    },

    /// The guest allocator failed to provide memory.
    #[error("E103: Guest allocation of {requested} bytes failed: {cause}")]
    AllocationFailed {
        /// Number of bytes requested.
        requested: u32,
        /// Reason for the failure.
        cause: String,
    },

    /// A length or offset did not fit the 32-bit guest address space.
    #[error("E104: Value {value} does not fit in the guest address space")]
    AddressOverflow {
        /// The offending value.
        value: u64,
    },

    // =========================================================================
    // Externref Table Errors (E201-E299)
    // =========================================================================
    /// Handle lies outside the table.
    #[error("E201: Handle {handle} is outside the externref table (capacity {capacity})")]
    InvalidHandle {
        /// The handle that was dereferenced.
        handle: u32,
        /// Current table capacity.
        capacity: u32,
    },

    /// Handle refers to a slot that has been freed.
    #[error("E202: Handle {handle} refers to a released slot")]
    StaleHandle {
        /// The stale handle.
        handle: u32,
    },

    /// Handle refers to a reserved slot that cannot be written or read.
    #[error("E203: Handle {handle} is reserved")]
    ReservedHandle {
        /// The reserved handle.
        handle: u32,
    },

    /// A handle resolved to a value of the wrong kind.
    #[error("E204: Expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind the caller required.
        expected: String,
        /// The kind actually stored.
        found: String,
    },

    /// The table cannot grow any further.
    #[error("E205: Externref table exhausted at capacity {capacity}")]
    TableExhausted {
        /// Capacity at the time of failure.
        capacity: u32,
    },

    // =========================================================================
    // Closure Errors (E301-E399)
    // =========================================================================
    /// A mutable closure was entered while already running.
    #[error("E301: Closure with destructor {dtor} invoked recursively")]
    ClosureReentered {
        /// Destructor index identifying the closure.
        dtor: u32,
    },

    /// The guest function table has no callable entry at the index.
    #[error("E302: No guest function at table index {index}")]
    TrampolineMissing {
        /// The function table index.
        index: u32,
    },

    // =========================================================================
    // Enum Translation Errors (E401-E499)
    // =========================================================================
    /// Guest passed an enum code with no host mapping.
    #[error("E401: Code {code} is out of range for {domain} ({len} values)")]
    EnumOutOfRange {
        /// Enumeration domain name.
        domain: &'static str,
        /// The offending code.
        code: u32,
        /// Number of values in the domain.
        len: usize,
    },

    // =========================================================================
    // Exception Bridge Errors (E501-E599)
    // =========================================================================
    /// A host exception escaped a call that does not catch.
    #[error("E501: Uncaught host exception: {message}")]
    UncaughtHostException {
        /// Rendered exception.
        message: String,
    },

    /// The guest raised an error through the throw intrinsic.
    #[error("E502: Guest threw: {message}")]
    GuestThrow {
        /// Message supplied by the guest.
        message: String,
    },

    // =========================================================================
    // Wasm and Lifecycle Errors (E601-E699)
    // =========================================================================
    /// Failed to compile or instantiate the guest module.
    #[error("E601: Failed to load guest module: {cause}")]
    WasmLoad {
        /// Reason for the failure.
        cause: String,
    },

    /// A required export is missing or has the wrong signature.
    #[error("E602: Guest export '{name}' unavailable: {cause}")]
    MissingExport {
        /// Export name.
        name: String,
        /// Reason it could not be used.
        cause: String,
    },

    /// Registering a host function with the linker failed.
    #[error("E603: Host function '{function}' failed: {cause}")]
    WasmHostFunction {
        /// Import name.
        function: String,
        /// Reason for the failure.
        cause: String,
    },

    /// Guest code trapped.
    #[error("E604: Guest trapped in '{function}': {cause}")]
    WasmTrap {
        /// Function that was executing.
        function: String,
        /// Trap description.
        cause: String,
    },

    /// An operation required an instantiated guest.
    #[error("E605: Bridge not initialized: {operation} requires an instance")]
    NotInitialized {
        /// The operation attempted.
        operation: String,
    },

    // =========================================================================
    // Configuration and I/O Errors (E901-E999)
    // =========================================================================
    /// Configuration value is invalid.
    #[error("E901: Invalid configuration for {field}: {cause}")]
    ConfigValue {
        /// Field name.
        field: String,
        /// Reason the value is invalid.
        cause: String,
    },

    /// Reading a module from disk failed.
    #[error("E902: I/O error at {path}: {cause}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Fetching a module over the network failed.
    #[error("E903: Network error fetching {url}: {cause}")]
    Network {
        /// The resource that was requested.
        url: String,
        /// Reason for the failure.
        cause: String,
    },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "E101",
            Self::InvalidUtf8 { .. } => "E102",
            Self::AllocationFailed { .. } => "E103",
            Self::AddressOverflow { .. } => "E104",
            Self::InvalidHandle { .. } => "E201",
            Self::StaleHandle { .. } => "E202",
            Self::ReservedHandle { .. } => "E203",
            Self::TypeMismatch { .. } => "E204",
            Self::TableExhausted { .. } => "E205",
            Self::ClosureReentered { .. } => "E301",
            Self::TrampolineMissing { .. } => "E302",
            Self::EnumOutOfRange { .. } => "E401",
            Self::UncaughtHostException { .. } => "E501",
            Self::GuestThrow { .. } => "E502",
            Self::WasmLoad { .. } => "E601",
            Self::MissingExport { .. } => "E602",
            Self::WasmHostFunction { .. } => "E603",
            Self::WasmTrap { .. } => "E604",
            Self::NotInitialized { .. } => "E605",
            Self::ConfigValue { .. } => "E901",
            Self::Io { .. } => "E902",
            Self::Network { .. } => "E903",
        }
    }

    /// Check if this error means guest and bridge disagree about the
    /// boundary contract. These abort the current operation.
    #[must_use]
    pub fn is_marshalling_fault(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. }
                | Self::InvalidUtf8 { .. }
                | Self::AddressOverflow { .. }
                | Self::InvalidHandle { .. }
                | Self::StaleHandle { .. }
                | Self::ReservedHandle { .. }
                | Self::TypeMismatch { .. }
                | Self::ClosureReentered { .. }
                | Self::TrampolineMissing { .. }
                | Self::EnumOutOfRange { .. }
        )
    }

    /// Check if this error is a configuration/validation error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigValue { .. } | Self::MissingExport { .. } | Self::WasmLoad { .. }
        )
    }

    /// Check if this error is retriable.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_embedded_in_messages() {
        let err = BridgeError::StaleHandle { handle: 140 };
        assert_eq!(err.code(), "E202");
        assert!(err.to_string().starts_with("E202:"));
    }

    #[test]
    fn classification() {
        let fault = BridgeError::EnumOutOfRange {
            domain: "GpuCullMode",
            code: 9,
            len: 3,
        };
        assert!(fault.is_marshalling_fault());
        assert!(!fault.is_config_error());

        let missing = BridgeError::MissingExport {
            name: "memory".into(),
            cause: "not exported".into(),
        };
        assert!(missing.is_config_error());
        assert!(!missing.is_marshalling_fault());

        let net = BridgeError::Network {
            url: "http://localhost/guest.wasm".into(),
            cause: "connection refused".into(),
        };
        assert!(net.is_retriable());
    }
}
