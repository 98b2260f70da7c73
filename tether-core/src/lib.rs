//! Tether core
//!
//! Host-side state for bridging a WebAssembly guest to an object-oriented
//! host API. The guest can only pass integers and floats; everything richer
//! travels through the structures in this crate.
//!
//! # Key Components
//!
//! - **Table**: host objects addressed by integer handle, with sentinel slots
//!   for undefined, null, true and false
//! - **Memory**: views over the guest's linear memory that rebuild when the
//!   buffer moves, plus the UTF-8 string codec
//! - **Closures**: reference-counted guest callbacks the host may call later
//! - **Enums**: integer-code tables for every string enumeration
//! - **Exceptions**: the out-of-band slot that carries host exceptions to
//!   the guest
//! - **Tasks**: promises, microtasks and animation frames
//!
//! The wasm engine integration lives in `tether-host`; everything here is
//! engine-agnostic and testable with [`testing::MockGuest`].
//!
//! # Example
//!
//! ```
//! use tether_core::prelude::*;
//!
//! let mut table = ExternrefTable::new(TableConfig::testing())?;
//! let handle = table.alloc(HostValue::from("adapter"))?;
//! assert_eq!(table.get(handle)?.as_str(), Some("adapter"));
//! table.free(handle)?;
//! assert!(table.get(handle).is_err());
//! # Ok::<(), tether_core::BridgeError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod closure;
pub mod enums;
pub mod error;
pub mod exception;
pub mod memory;
pub mod prelude;
pub mod promise;
pub mod table;
pub mod tasks;
pub mod testing;
pub mod value;

pub use closure::{FinalizerQueue, GuestCalls, GuestClosure};
pub use enums::EnumTable;
pub use error::{BridgeError, Result};
pub use exception::ExceptionSlot;
pub use memory::{GuestAllocator, GuestMemory, GuestStr, ViewCache};
pub use promise::HostPromise;
pub use table::{ExternrefTable, TableConfig};
pub use tasks::{GuestRuntime, HostCx, TaskQueue};
pub use value::{HostException, HostIterator, HostObject, HostResult, HostValue};
