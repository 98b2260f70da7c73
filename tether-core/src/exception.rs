//! Out-of-band exception slot.
//!
//! The call boundary carries only numbers, so a host exception cannot
//! unwind into the guest. A catching call stores the thrown value in the
//! externref table, records the handle here, and returns a neutral value.
//! The guest checks the slot after the call and rethrows what it retrieves.

use crate::error::Result;
use crate::table::ExternrefTable;
use crate::value::HostResult;

/// Holds at most one pending exception handle.
#[derive(Debug, Default)]
pub struct ExceptionSlot {
    pending: Option<u32>,
    stored: u64,
}

impl ExceptionSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a thrown value's handle. An earlier exception the guest never
    /// took is released so it can never be retrieved later.
    pub fn store(&mut self, table: &mut ExternrefTable, handle: u32) -> Result<()> {
        if let Some(previous) = self.pending.replace(handle) {
            tracing::debug!(previous, handle, "replacing untaken exception");
            table.free(previous)?;
        }
        self.stored += 1;
        Ok(())
    }

    /// Retrieve and clear the pending exception.
    pub fn take(&mut self) -> Option<u32> {
        self.pending.take()
    }

    /// Whether an exception is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Total exceptions stored over the slot's lifetime.
    pub fn stored(&self) -> u64 {
        self.stored
    }

    /// Route a host outcome: values pass through, a thrown value is stored
    /// and `None` returned.
    pub fn capture<T>(
        &mut self,
        table: &mut ExternrefTable,
        outcome: HostResult<T>,
    ) -> Result<Option<T>> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(thrown) => {
                tracing::debug!(exception = %thrown.debug_string(), "host call threw");
                let handle = table.alloc(thrown)?;
                self.store(table, handle)?;
                Ok(None)
            }
        }
    }

    /// Run `op` and capture what it throws.
    pub fn guard<T>(
        &mut self,
        table: &mut ExternrefTable,
        op: impl FnOnce() -> HostResult<T>,
    ) -> Result<Option<T>> {
        self.capture(table, op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableConfig;
    use crate::value::{HostException, HostValue};

    fn table() -> ExternrefTable {
        ExternrefTable::new(TableConfig::testing()).unwrap()
    }

    #[test]
    fn success_passes_through() {
        let mut t = table();
        let mut slot = ExceptionSlot::new();
        let out = slot.guard(&mut t, || Ok(7)).unwrap();
        assert_eq!(out, Some(7));
        assert!(!slot.is_pending());
    }

    #[test]
    fn throw_is_stored_once_and_retrieved_once() {
        let mut t = table();
        let mut slot = ExceptionSlot::new();
        let out: Option<()> = slot
            .guard(&mut t, || Err(HostException::validation("bad descriptor").into()))
            .unwrap();
        assert!(out.is_none());

        let handle = slot.take().unwrap();
        let thrown = t.get(handle).unwrap();
        assert!(thrown.instance_of("GPUValidationError"));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn original_object_is_preserved() {
        let mut t = table();
        let mut slot = ExceptionSlot::new();
        let thrown = HostValue::from(HostException::error("boom").with_stack("at f"));
        slot.capture::<()>(&mut t, Err(thrown.clone())).unwrap();
        let handle = slot.take().unwrap();
        assert_eq!(t.get(handle).unwrap(), &thrown);
    }

    #[test]
    fn untaken_exception_is_replaced_and_released() {
        let mut t = table();
        let mut slot = ExceptionSlot::new();
        slot.capture::<()>(&mut t, Err(HostValue::from("first"))).unwrap();
        slot.capture::<()>(&mut t, Err(HostValue::from("second"))).unwrap();
        assert_eq!(t.live(), 1);
        let handle = slot.take().unwrap();
        assert_eq!(t.get(handle).unwrap().as_str(), Some("second"));
        assert_eq!(slot.stored(), 2);
    }
}
