//! Test doubles for code that talks to a guest.
//!
//! [`MockGuest`] implements every guest-facing trait in this crate without a
//! wasm engine, so the table, codec, closure and task machinery can be
//! exercised directly and their effects asserted through recorded events.

mod guest;

pub use guest::{GuestEvent, HEAP_BASE, IndirectCall, MockGuest};
