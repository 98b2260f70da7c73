//! Externref table: host objects addressed by integer handle.
//!
//! Layout:
//!
//! ```text
//! 0                 placeholder, returned for absent nullable results
//! 1 .. offset       never issued
//! offset + 0        undefined
//! offset + 1        null
//! offset + 2        true
//! offset + 3        false
//! offset + 4 ..     allocated handles
//! ```
//!
//! Storage grows in place, so the reserved block keeps its indices for the
//! lifetime of the table. Freed slots go on a LIFO free list and are reused
//! before the table grows.

use crate::error::{BridgeError, Result};
use crate::value::HostValue;
use serde::{Deserialize, Serialize};

/// Handle returned for an absent nullable result.
pub const PLACEHOLDER: u32 = 0;

/// Number of reserved sentinel slots after the offset.
pub const RESERVED_SLOTS: u32 = 4;

/// Table sizing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Index of the first sentinel slot.
    pub offset: u32,
    /// Multiplier applied to capacity when the table is full.
    pub growth_factor: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            offset: 128,
            growth_factor: 2,
        }
    }
}

impl TableConfig {
    /// Configuration for unit tests: a small offset keeps handles readable.
    pub fn testing() -> Self {
        Self {
            offset: 4,
            growth_factor: 2,
        }
    }

    /// Set the sentinel offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set the growth factor.
    pub fn with_growth_factor(mut self, factor: u32) -> Self {
        self.growth_factor = factor;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.offset == 0 {
            return Err(BridgeError::ConfigValue {
                field: "table.offset".into(),
                cause: "slot 0 is the placeholder; offset must be at least 1".into(),
            });
        }
        if self.growth_factor < 2 {
            return Err(BridgeError::ConfigValue {
                field: "table.growth_factor".into(),
                cause: format!("must be at least 2, got {}", self.growth_factor),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
enum Slot {
    Unused,
    Reserved(HostValue),
    Vacant,
    Occupied(HostValue),
}

/// Point-in-time table statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableStats {
    /// Handles currently allocated.
    pub live: usize,
    /// Total slots, reserved ones included.
    pub capacity: usize,
    /// Freed slots awaiting reuse.
    pub free: usize,
    /// Number of growth events.
    pub grows: u64,
}

/// Growable slot array holding host values reachable by handle.
pub struct ExternrefTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next: u32,
    offset: u32,
    growth_factor: u32,
    live: usize,
    grows: u64,
}

impl Default for ExternrefTable {
    fn default() -> Self {
        Self::build(TableConfig::default())
    }
}

impl ExternrefTable {
    /// Create a table with the given configuration.
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TableConfig) -> Self {
        let first = config.offset + RESERVED_SLOTS;
        let mut table = Self {
            slots: vec![Slot::Unused; first as usize * 2],
            free: Vec::new(),
            next: first,
            offset: config.offset,
            growth_factor: config.growth_factor,
            live: 0,
            grows: 0,
        };
        table.slots[PLACEHOLDER as usize] = Slot::Reserved(HostValue::Undefined);
        for index in first as usize..table.slots.len() {
            table.slots[index] = Slot::Vacant;
        }
        table.init_reserved();
        table
    }

    /// Establish the sentinel slots. Safe to call repeatedly.
    pub fn init_reserved(&mut self) {
        let sentinels = [
            HostValue::Undefined,
            HostValue::Null,
            HostValue::Bool(true),
            HostValue::Bool(false),
        ];
        for (i, value) in sentinels.into_iter().enumerate() {
            self.slots[(self.offset + i as u32) as usize] = Slot::Reserved(value);
        }
    }

    /// Handle of the undefined sentinel.
    pub fn undefined_handle(&self) -> u32 {
        self.offset
    }

    /// Handle of the null sentinel.
    pub fn null_handle(&self) -> u32 {
        self.offset + 1
    }

    /// Handle of the `true` sentinel.
    pub fn true_handle(&self) -> u32 {
        self.offset + 2
    }

    /// Handle of the `false` sentinel.
    pub fn false_handle(&self) -> u32 {
        self.offset + 3
    }

    /// Check whether a handle is the placeholder or a sentinel.
    pub fn is_reserved(&self, handle: u32) -> bool {
        handle == PLACEHOLDER || (self.offset..self.offset + RESERVED_SLOTS).contains(&handle)
    }

    /// Store a value in a fresh slot and return its handle.
    pub fn alloc(&mut self, value: HostValue) -> Result<u32> {
        let handle = match self.free.pop() {
            Some(handle) => handle,
            None => {
                if self.next as usize >= self.slots.len() {
                    self.grow()?;
                }
                let handle = self.next;
                self.next += 1;
                handle
            }
        };
        self.slots[handle as usize] = Slot::Occupied(value);
        self.live += 1;
        tracing::trace!(handle, live = self.live, "externref allocated");
        Ok(handle)
    }

    /// Like [`alloc`](Self::alloc), but maps undefined, null and booleans
    /// onto their sentinel handles.
    pub fn intern(&mut self, value: HostValue) -> Result<u32> {
        match value {
            HostValue::Undefined => Ok(self.undefined_handle()),
            HostValue::Null => Ok(self.null_handle()),
            HostValue::Bool(true) => Ok(self.true_handle()),
            HostValue::Bool(false) => Ok(self.false_handle()),
            other => self.alloc(other),
        }
    }

    /// Allocate a second handle to the value behind `handle`.
    pub fn clone_ref(&mut self, handle: u32) -> Result<u32> {
        let value = self.get(handle)?.clone();
        if self.is_reserved(handle) {
            return Ok(handle);
        }
        self.alloc(value)
    }

    /// Resolve a handle.
    pub fn get(&self, handle: u32) -> Result<&HostValue> {
        match self.slots.get(handle as usize) {
            Some(Slot::Occupied(value)) => Ok(value),
            Some(Slot::Reserved(value)) if handle != PLACEHOLDER => Ok(value),
            Some(Slot::Reserved(_)) => Err(BridgeError::ReservedHandle { handle }),
            Some(Slot::Vacant) if handle < self.next => Err(BridgeError::StaleHandle { handle }),
            _ => Err(BridgeError::InvalidHandle {
                handle,
                capacity: self.capacity(),
            }),
        }
    }

    /// Replace the value behind a live handle.
    pub fn set(&mut self, handle: u32, value: HostValue) -> Result<()> {
        if self.is_reserved(handle) {
            return Err(BridgeError::ReservedHandle { handle });
        }
        let capacity = self.capacity();
        match self.slots.get_mut(handle as usize) {
            Some(slot @ Slot::Occupied(_)) => {
                *slot = Slot::Occupied(value);
                Ok(())
            }
            Some(Slot::Vacant) if handle < self.next => Err(BridgeError::StaleHandle { handle }),
            _ => Err(BridgeError::InvalidHandle { handle, capacity }),
        }
    }

    /// Release a handle. Reserved handles are ignored.
    ///
    /// Returns the value that was stored so the caller controls when it is
    /// dropped.
    pub fn free(&mut self, handle: u32) -> Result<Option<HostValue>> {
        if self.is_reserved(handle) {
            return Ok(None);
        }
        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(handle as usize)
            .ok_or(BridgeError::InvalidHandle { handle, capacity })?;
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(value) => {
                self.free.push(handle);
                self.live -= 1;
                tracing::trace!(handle, live = self.live, "externref released");
                Ok(Some(value))
            }
            Slot::Vacant if handle < self.next => Err(BridgeError::StaleHandle { handle }),
            previous => {
                *slot = previous;
                Err(BridgeError::InvalidHandle { handle, capacity })
            }
        }
    }

    /// Current capacity in slots.
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of live handles.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> TableStats {
        TableStats {
            live: self.live,
            capacity: self.slots.len(),
            free: self.free.len(),
            grows: self.grows,
        }
    }

    fn grow(&mut self) -> Result<()> {
        let current = self.slots.len() as u64;
        let target = (current * u64::from(self.growth_factor)).min(u64::from(u32::MAX));
        if target <= current {
            return Err(BridgeError::TableExhausted {
                capacity: self.capacity(),
            });
        }
        self.slots.resize(target as usize, Slot::Vacant);
        self.grows += 1;
        tracing::debug!(from = current, to = target, "externref table grown");
        Ok(())
    }
}
