//! Guest callbacks invocable from the host event loop.
//!
//! A guest closure is two opaque environment words, a destructor index and
//! a trampoline index, both into the guest's function table. The host may
//! invoke it any number of times until the guest releases it. The count
//! starts at one for the guest's own reference; every invocation holds an
//! extra count while it runs. Whichever side brings the count to zero owns
//! destruction:
//!
//! - [`GuestClosure::drop_ref`] returning `true` tells the guest to free the
//!   environment itself.
//! - An invocation that finishes last calls the destructor.
//!
//! If neither happens before the host's last reference disappears, the
//! closure is queued on the [`FinalizerQueue`] and destroyed on the next
//! drain. The queue is a backstop only.

use crate::error::{BridgeError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CLOSURE_ID: AtomicU64 = AtomicU64::new(1);

/// Calls into the guest's indirect function table.
pub trait GuestCalls {
    /// Invoke the function at `index` with i32 arguments.
    fn call_indirect(&mut self, index: u32, args: &[u32]) -> Result<()>;
}

/// A destructor call owed to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalization {
    /// Destructor function table index.
    pub dtor: u32,
    /// First environment word.
    pub a: u32,
    /// Second environment word.
    pub b: u32,
}

/// Closures whose host references all went away while still live.
#[derive(Clone, Default)]
pub struct FinalizerQueue(Arc<Mutex<Vec<Finalization>>>);

impl FinalizerQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending finalizations.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn push(&self, finalization: Finalization) {
        self.0.lock().push(finalization);
    }

    /// Take every pending finalization.
    pub fn take(&self) -> Vec<Finalization> {
        std::mem::take(&mut *self.0.lock())
    }

    /// Run every pending destructor. Returns how many ran.
    pub fn drain<G: GuestCalls + ?Sized>(&self, guest: &mut G) -> Result<usize> {
        let pending = self.take();
        for f in &pending {
            tracing::debug!(dtor = f.dtor, a = f.a, b = f.b, "finalizing unreleased closure");
            guest.call_indirect(f.dtor, &[f.a, f.b])?;
        }
        Ok(pending.len())
    }
}

#[derive(Debug)]
struct ClosureState {
    a: u32,
    b: u32,
    cnt: u32,
    dtor: u32,
    trampoline: u32,
    destroyed: bool,
}

/// A reference-counted guest callback.
pub struct GuestClosure {
    id: u64,
    state: Mutex<ClosureState>,
    finalizers: FinalizerQueue,
}

impl GuestClosure {
    /// Wrap a guest closure. The count starts at one for the guest's
    /// reference.
    pub fn new(
        a: u32,
        b: u32,
        dtor: u32,
        trampoline: u32,
        finalizers: FinalizerQueue,
    ) -> Arc<Self> {
        let id = NEXT_CLOSURE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id, a, b, dtor, trampoline, "closure wrapped");
        Arc::new(Self {
            id,
            state: Mutex::new(ClosureState {
                a,
                b,
                cnt: 1,
                dtor,
                trampoline,
                destroyed: false,
            }),
            finalizers,
        })
    }

    /// Process-unique identifier for diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current reference count.
    pub fn ref_count(&self) -> u32 {
        self.state.lock().cnt
    }

    /// Whether the guest environment has been released.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Invoke the trampoline with `(a, b, args...)`.
    ///
    /// After release this is a silent no-op. The state lock is never held
    /// while the guest runs, so the guest may drop its reference from
    /// inside the call.
    pub fn invoke<G: GuestCalls + ?Sized>(&self, guest: &mut G, args: &[u32]) -> Result<()> {
        let (a, b, trampoline) = {
            let mut state = self.state.lock();
            if state.destroyed || state.cnt == 0 {
                tracing::debug!(id = self.id, "closure invoked after release; ignoring");
                return Ok(());
            }
            if state.a == 0 {
                return Err(BridgeError::ClosureReentered { dtor: state.dtor });
            }
            state.cnt += 1;
            let a = std::mem::replace(&mut state.a, 0);
            (a, state.b, state.trampoline)
        };

        let mut words = Vec::with_capacity(args.len() + 2);
        words.extend_from_slice(&[a, b]);
        words.extend_from_slice(args);
        let outcome = guest.call_indirect(trampoline, &words);

        let destroy = {
            let mut state = self.state.lock();
            state.cnt -= 1;
            if state.cnt == 0 {
                state.destroyed = true;
                Some(state.dtor)
            } else {
                state.a = a;
                None
            }
        };
        if let Some(dtor) = destroy {
            tracing::trace!(id = self.id, dtor, "closure destroyed after final invocation");
            let dropped = guest.call_indirect(dtor, &[a, b]);
            return outcome.and(dropped);
        }
        outcome
    }

    /// Drop the guest's reference. Returns `true` when this was the last
    /// reference and the guest must destroy the environment itself.
    pub fn drop_ref(&self) -> bool {
        let mut state = self.state.lock();
        if state.destroyed || state.cnt == 0 {
            return false;
        }
        state.cnt -= 1;
        if state.cnt == 0 {
            state.a = 0;
            state.destroyed = true;
            tracing::trace!(id = self.id, "closure released by guest");
            true
        } else {
            false
        }
    }
}

impl Drop for GuestClosure {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.destroyed && state.a != 0 {
            state.destroyed = true;
            self.finalizers.push(Finalization {
                dtor: state.dtor,
                a: state.a,
                b: state.b,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGuest;

    const TRAMPOLINE: u32 = 10;
    const DTOR: u32 = 11;

    fn closure(guest: &MockGuest) -> Arc<GuestClosure> {
        GuestClosure::new(100, 200, DTOR, TRAMPOLINE, guest.finalizers())
    }

    #[test]
    fn repeated_invocation_keeps_environment() {
        let mut guest = MockGuest::new();
        let c = closure(&guest);
        for _ in 0..3 {
            c.invoke(&mut guest, &[7]).unwrap();
        }
        assert_eq!(guest.calls_to(TRAMPOLINE), 3);
        assert_eq!(guest.calls()[0].args, vec![100, 200, 7]);
        assert_eq!(guest.calls_to(DTOR), 0);
        assert_eq!(c.ref_count(), 1);
    }

    #[test]
    fn drop_ref_outside_invocation_hands_destruction_to_guest() {
        let mut guest = MockGuest::new();
        let c = closure(&guest);
        c.invoke(&mut guest, &[]).unwrap();
        assert!(c.drop_ref());
        assert!(!c.drop_ref());
        c.invoke(&mut guest, &[]).unwrap();
        assert_eq!(guest.calls_to(TRAMPOLINE), 1);
        assert_eq!(guest.calls_to(DTOR), 0);
        drop(c);
        assert!(guest.finalizers().is_empty());
    }

    #[test]
    fn drop_during_invocation_defers_destruction() {
        let mut guest = MockGuest::new();
        let c = closure(&guest);
        let inner = Arc::clone(&c);
        guest.on_call(TRAMPOLINE, move |_, _| {
            assert!(!inner.drop_ref());
            Ok(())
        });
        c.invoke(&mut guest, &[]).unwrap();
        assert_eq!(guest.calls_to(DTOR), 1);
        assert_eq!(guest.calls_for(DTOR)[0].args, vec![100, 200]);
        assert!(c.is_destroyed());

        c.invoke(&mut guest, &[]).unwrap();
        assert_eq!(guest.calls_to(TRAMPOLINE), 1);
        assert_eq!(guest.calls_to(DTOR), 1);
    }

    #[test]
    fn recursive_invocation_is_rejected() {
        let mut guest = MockGuest::new();
        let c = closure(&guest);
        let inner = Arc::clone(&c);
        guest.on_call(TRAMPOLINE, move |guest, _| {
            let err = inner.invoke(guest, &[]).unwrap_err();
            assert!(matches!(err, BridgeError::ClosureReentered { dtor: DTOR }));
            Ok(())
        });
        c.invoke(&mut guest, &[]).unwrap();
        assert_eq!(c.ref_count(), 1);
    }

    #[test]
    fn unreleased_closure_is_finalized_once() {
        let mut guest = MockGuest::new();
        let c = closure(&guest);
        c.invoke(&mut guest, &[]).unwrap();
        drop(c);
        let queue = guest.finalizers();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(&mut guest).unwrap(), 1);
        assert_eq!(queue.drain(&mut guest).unwrap(), 0);
        assert_eq!(guest.calls_for(DTOR)[0].args, vec![100, 200]);
    }

    #[test]
    fn trampoline_failure_still_restores_state() {
        let mut guest = MockGuest::new();
        let c = closure(&guest);
        guest.on_call(TRAMPOLINE, |_, _| {
            Err(BridgeError::WasmTrap {
                function: "trampoline".into(),
                cause: "unreachable".into(),
            })
        });
        assert!(c.invoke(&mut guest, &[]).is_err());
        assert_eq!(c.ref_count(), 1);
        assert!(!c.is_destroyed());
        assert!(c.drop_ref());
    }
}
