//! In-process stand-in for a compiled guest module.
//!
//! `MockGuest` owns a byte buffer acting as linear memory, a bump allocator
//! with the guest's `malloc`/`realloc`/`free` contract, an externref table
//! and a function table whose entries are optional Rust hooks. Every
//! allocator and table call is recorded as a [`GuestEvent`].

use crate::closure::{FinalizerQueue, GuestCalls};
use crate::error::{BridgeError, Result};
use crate::memory::{GuestAllocator, GuestMemory, Linear, ViewCache, WASM_PAGE_SIZE};
use crate::table::{ExternrefTable, TableConfig};
use crate::tasks::GuestRuntime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First address handed out by the mock allocator.
pub const HEAP_BASE: u32 = 1024;

/// An event observed by the mock guest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuestEvent {
    /// `malloc` was called.
    Malloc {
        /// Requested size.
        size: u32,
        /// Returned address.
        ptr: u32,
    },
    /// `realloc` was called.
    Realloc {
        /// Previous address.
        ptr: u32,
        /// Previous size.
        old_size: u32,
        /// Requested size.
        new_size: u32,
        /// Returned address.
        moved_to: u32,
    },
    /// `free` was called.
    Free {
        /// Released address.
        ptr: u32,
        /// Released size.
        size: u32,
    },
    /// Linear memory grew.
    Grow {
        /// Pages added.
        pages: u32,
    },
    /// An indirect function was called.
    Call {
        /// Function table index.
        index: u32,
        /// Arguments.
        args: Vec<u32>,
    },
}

impl GuestEvent {
    /// The event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Malloc { .. } => "malloc",
            Self::Realloc { .. } => "realloc",
            Self::Free { .. } => "free",
            Self::Grow { .. } => "grow",
            Self::Call { .. } => "call",
        }
    }
}

/// One call through the function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectCall {
    /// Function table index.
    pub index: u32,
    /// Arguments.
    pub args: Vec<u32>,
}

type Hook = Box<dyn FnMut(&mut MockGuest, &[u32]) -> Result<()>>;

/// A scriptable guest.
pub struct MockGuest {
    memory: Vec<u8>,
    views: ViewCache,
    top: u32,
    realloc: bool,
    reallocs: usize,
    freed: Vec<(u32, u32)>,
    table: ExternrefTable,
    finalizers: FinalizerQueue,
    hooks: HashMap<u32, Hook>,
    calls: Vec<IndirectCall>,
    events: Vec<GuestEvent>,
}

impl Default for MockGuest {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGuest {
    /// One page of memory, `realloc` exported.
    pub fn new() -> Self {
        Self {
            memory: vec![0; WASM_PAGE_SIZE],
            views: ViewCache::new(),
            top: HEAP_BASE,
            realloc: true,
            reallocs: 0,
            freed: Vec::new(),
            table: ExternrefTable::new(TableConfig::testing()).unwrap_or_default(),
            finalizers: FinalizerQueue::new(),
            hooks: HashMap::new(),
            calls: Vec::new(),
            events: Vec::new(),
        }
    }

    /// A guest that does not export `realloc`.
    pub fn without_realloc() -> Self {
        Self {
            realloc: false,
            ..Self::new()
        }
    }

    /// Register a hook run when the function at `index` is called.
    pub fn on_call<F>(&mut self, index: u32, hook: F)
    where
        F: FnMut(&mut MockGuest, &[u32]) -> Result<()> + 'static,
    {
        self.hooks.insert(index, Box::new(hook));
    }

    /// Grow memory by `pages`. The buffer always moves.
    pub fn grow(&mut self, pages: u32) {
        let size = self.memory.len() + pages as usize * WASM_PAGE_SIZE;
        let mut moved = vec![0u8; size];
        moved[..self.memory.len()].copy_from_slice(&self.memory);
        self.memory = moved;
        self.events.push(GuestEvent::Grow { pages });
    }

    /// Copy bytes out of memory.
    ///
    /// # Panics
    ///
    /// Panics if the span is out of bounds.
    pub fn read_bytes(&self, ptr: u32, len: u32) -> Vec<u8> {
        let start = ptr as usize;
        self.memory[start..start + len as usize].to_vec()
    }

    /// Copy bytes into memory.
    ///
    /// # Panics
    ///
    /// Panics if the span is out of bounds.
    pub fn write_bytes(&mut self, ptr: u32, bytes: &[u8]) {
        self.memory[ptr as usize..ptr as usize + bytes.len()].copy_from_slice(bytes);
    }

    /// Current memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.len()
    }

    /// The view cache.
    pub fn views(&self) -> &ViewCache {
        &self.views
    }

    /// The externref table.
    pub fn table(&self) -> &ExternrefTable {
        &self.table
    }

    /// A handle on the finalizer queue shared with closures made for this
    /// guest.
    pub fn finalizers(&self) -> FinalizerQueue {
        self.finalizers.clone()
    }

    /// Every indirect call in order.
    pub fn calls(&self) -> &[IndirectCall] {
        &self.calls
    }

    /// Calls made to `index`.
    pub fn calls_for(&self, index: u32) -> Vec<IndirectCall> {
        self.calls.iter().filter(|c| c.index == index).cloned().collect()
    }

    /// Number of calls made to `index`.
    pub fn calls_to(&self, index: u32) -> usize {
        self.calls.iter().filter(|c| c.index == index).count()
    }

    /// Number of `realloc` calls.
    pub fn realloc_count(&self) -> usize {
        self.reallocs
    }

    /// `(ptr, size)` of every `free` call.
    pub fn freed(&self) -> &[(u32, u32)] {
        &self.freed
    }

    /// Recorded events.
    pub fn events(&self) -> &[GuestEvent] {
        &self.events
    }

    /// Recorded events as JSON, for snapshot-style assertions.
    pub fn events_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.events).unwrap_or(serde_json::Value::Null)
    }

    fn bump(&mut self, size: u32, align: u32) -> Result<u32> {
        let align = align.max(1);
        let ptr = self.top.div_ceil(align) * align;
        let end = ptr.checked_add(size).ok_or(BridgeError::AllocationFailed {
            requested: size,
            cause: "address space exhausted".into(),
        })?;
        while end as usize > self.memory.len() {
            self.grow(1);
        }
        self.top = end;
        Ok(ptr)
    }
}

impl GuestMemory for MockGuest {
    fn linear(&mut self) -> Linear<'_> {
        Linear::new(&mut self.memory, &mut self.views)
    }
}

impl GuestAllocator for MockGuest {
    fn malloc(&mut self, size: u32, align: u32) -> Result<u32> {
        let ptr = self.bump(size, align)?;
        self.events.push(GuestEvent::Malloc { size, ptr });
        Ok(ptr)
    }

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32, align: u32) -> Result<u32> {
        if !self.realloc {
            return Err(BridgeError::AllocationFailed {
                requested: new_size,
                cause: "guest does not export realloc".into(),
            });
        }
        self.reallocs += 1;
        let moved_to = if u64::from(ptr) + u64::from(old_size) == u64::from(self.top) {
            self.top = ptr;
            self.bump(new_size, 1)?
        } else {
            let fresh = self.bump(new_size, align)?;
            let keep = old_size.min(new_size) as usize;
            self.memory
                .copy_within(ptr as usize..ptr as usize + keep, fresh as usize);
            fresh
        };
        self.events.push(GuestEvent::Realloc {
            ptr,
            old_size,
            new_size,
            moved_to,
        });
        Ok(moved_to)
    }

    fn free(&mut self, ptr: u32, size: u32, _align: u32) -> Result<()> {
        self.freed.push((ptr, size));
        self.events.push(GuestEvent::Free { ptr, size });
        Ok(())
    }

    fn can_realloc(&self) -> bool {
        self.realloc
    }
}

impl GuestCalls for MockGuest {
    fn call_indirect(&mut self, index: u32, args: &[u32]) -> Result<()> {
        self.calls.push(IndirectCall {
            index,
            args: args.to_vec(),
        });
        self.events.push(GuestEvent::Call {
            index,
            args: args.to_vec(),
        });
        let Some(mut hook) = self.hooks.remove(&index) else {
            return Ok(());
        };
        let outcome = hook(self, args);
        self.hooks.entry(index).or_insert(hook);
        outcome
    }
}

impl GuestRuntime for MockGuest {
    fn table_mut(&mut self) -> &mut ExternrefTable {
        &mut self.table
    }
}
