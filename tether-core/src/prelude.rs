//! Prelude for convenient imports.
//!
//! ```ignore
//! use tether_core::prelude::*;
//! ```

// Errors
pub use crate::error::{BridgeError, Result};

// Values
pub use crate::value::{
    ExceptionKind, FailureClass, HostArray, HostBytes, HostDict, HostException, HostIterator,
    HostObject, HostResult, HostValue,
};

// Table
pub use crate::table::{ExternrefTable, PLACEHOLDER, TableConfig, TableStats};

// Memory
pub use crate::memory::{
    GuestAllocator, GuestMemory, GuestStr, Linear, ViewCache, ViewKind, decode, encode,
    take_owned, write_out_pair,
};

// Callbacks and scheduling
pub use crate::closure::{FinalizerQueue, GuestCalls, GuestClosure};
pub use crate::exception::ExceptionSlot;
pub use crate::promise::{HostPromise, PromiseStatus};
pub use crate::tasks::{GuestRuntime, HostCx, Job, Settlement, TaskQueue, run_job};

// Enums
pub use crate::enums::EnumTable;
