//! Promises settled by the host and observed by guest continuations.
//!
//! A promise settles exactly once. Reactions registered with
//! [`HostPromise::then`] run as microtasks in registration order. Each
//! reaction owns a derived promise so chains work the usual way: a missing
//! handler passes the settlement through unchanged.

use crate::tasks::{Job, Settlement, TaskQueue};
use crate::value::HostValue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// Observable promise state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseStatus {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

pub(crate) struct Reaction {
    pub(crate) on_fulfilled: Option<HostValue>,
    pub(crate) on_rejected: Option<HostValue>,
    pub(crate) derived: Arc<HostPromise>,
}

impl Reaction {
    fn into_job(self, settlement: Settlement) -> Job {
        let handler = match &settlement {
            Settlement::Fulfilled(_) => self.on_fulfilled,
            Settlement::Rejected(_) => self.on_rejected,
        };
        Job::Reaction {
            handler,
            settlement,
            derived: self.derived,
        }
    }
}

struct PromiseInner {
    settlement: Option<Settlement>,
    reactions: Vec<Reaction>,
    handled: bool,
}

/// A host promise.
pub struct HostPromise {
    id: u64,
    tasks: TaskQueue,
    inner: Mutex<PromiseInner>,
}

impl HostPromise {
    /// Create a pending promise whose reactions run on `tasks`.
    pub fn new(tasks: &TaskQueue) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed),
            tasks: tasks.clone(),
            inner: Mutex::new(PromiseInner {
                settlement: None,
                reactions: Vec::new(),
                handled: false,
            }),
        })
    }

    /// Process-unique identifier for diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state.
    pub fn status(&self) -> PromiseStatus {
        match &self.inner.lock().settlement {
            None => PromiseStatus::Pending,
            Some(Settlement::Fulfilled(_)) => PromiseStatus::Fulfilled,
            Some(Settlement::Rejected(_)) => PromiseStatus::Rejected,
        }
    }

    /// The settled outcome, if any.
    pub fn outcome(&self) -> Option<Settlement> {
        self.inner.lock().settlement.clone()
    }

    /// Whether a rejection handler has been attached.
    pub fn is_handled(&self) -> bool {
        self.inner.lock().handled
    }

    /// Fulfil the promise. A promise value is adopted instead.
    pub fn resolve(self: &Arc<Self>, value: HostValue) {
        if let HostValue::Promise(other) = &value {
            if Arc::ptr_eq(other, self) {
                self.settle(Settlement::Rejected(
                    crate::value::HostException::type_error("Chaining cycle detected for promise")
                        .into(),
                ));
                return;
            }
            other.add_reaction(Reaction {
                on_fulfilled: None,
                on_rejected: None,
                derived: Arc::clone(self),
            });
            return;
        }
        self.settle(Settlement::Fulfilled(value));
    }

    /// Reject the promise.
    pub fn reject(self: &Arc<Self>, reason: HostValue) {
        self.settle(Settlement::Rejected(reason));
    }

    /// Settle with an already-classified outcome.
    pub fn settle(self: &Arc<Self>, settlement: Settlement) {
        let (reactions, unhandled) = {
            let mut inner = self.inner.lock();
            if inner.settlement.is_some() {
                tracing::trace!(id = self.id, "promise already settled; ignoring");
                return;
            }
            inner.settlement = Some(settlement.clone());
            let reactions = std::mem::take(&mut inner.reactions);
            let unhandled = settlement.is_rejected() && !inner.handled;
            (reactions, unhandled)
        };
        for reaction in reactions {
            self.tasks.enqueue(reaction.into_job(settlement.clone()));
        }
        if unhandled {
            self.tasks.note_rejection(Arc::clone(self));
        }
    }

    /// Attach continuations and return the derived promise.
    pub fn then(
        self: &Arc<Self>,
        on_fulfilled: Option<HostValue>,
        on_rejected: Option<HostValue>,
    ) -> Arc<HostPromise> {
        let derived = HostPromise::new(&self.tasks);
        self.add_reaction(Reaction {
            on_fulfilled,
            on_rejected,
            derived: Arc::clone(&derived),
        });
        derived
    }

    fn add_reaction(&self, reaction: Reaction) {
        let mut inner = self.inner.lock();
        inner.handled = true;
        match inner.settlement.clone() {
            Some(settlement) => {
                drop(inner);
                self.tasks.enqueue(reaction.into_job(settlement));
            }
            None => inner.reactions.push(reaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::run_job;
    use crate::testing::MockGuest;
    use crate::value::HostException;

    #[test]
    fn settles_exactly_once() {
        let tasks = TaskQueue::new();
        let p = HostPromise::new(&tasks);
        p.resolve(HostValue::from(1u32));
        p.reject(HostValue::from("late"));
        assert_eq!(p.status(), PromiseStatus::Fulfilled);
        assert_eq!(
            p.outcome(),
            Some(Settlement::Fulfilled(HostValue::from(1u32)))
        );
    }

    #[test]
    fn reactions_are_queued_in_registration_order() {
        let tasks = TaskQueue::new();
        let p = HostPromise::new(&tasks);
        let first = p.then(None, None);
        let second = p.then(None, None);
        assert_eq!(tasks.pending_jobs(), 0);

        p.resolve(HostValue::from("done"));
        assert_eq!(tasks.pending_jobs(), 2);
        match tasks.pop() {
            Some(Job::Reaction { derived, .. }) => assert!(Arc::ptr_eq(&derived, &first)),
            _ => panic!("expected reaction"),
        }
        match tasks.pop() {
            Some(Job::Reaction { derived, .. }) => assert!(Arc::ptr_eq(&derived, &second)),
            _ => panic!("expected reaction"),
        }
    }

    #[test]
    fn then_on_settled_promise_queues_immediately() {
        let tasks = TaskQueue::new();
        let p = HostPromise::new(&tasks);
        p.resolve(HostValue::Null);
        p.then(None, None);
        assert_eq!(tasks.pending_jobs(), 1);
    }

    #[test]
    fn unhandled_rejection_is_noted() {
        let tasks = TaskQueue::new();
        let p = HostPromise::new(&tasks);
        p.reject(HostException::operation_error("adapter unavailable").into());
        let unhandled = tasks.take_unhandled();
        assert_eq!(unhandled.len(), 1);
        assert_eq!(unhandled[0].id(), p.id());
    }

    #[test]
    fn late_handler_clears_unhandled_state() {
        let tasks = TaskQueue::new();
        let p = HostPromise::new(&tasks);
        p.reject(HostValue::from("nope"));
        p.then(None, None);
        assert!(tasks.take_unhandled().is_empty());
    }

    #[test]
    fn resolving_with_a_promise_adopts_it() {
        let tasks = TaskQueue::new();
        let inner = HostPromise::new(&tasks);
        let outer = HostPromise::new(&tasks);
        outer.resolve(HostValue::Promise(Arc::clone(&inner)));
        assert_eq!(outer.status(), PromiseStatus::Pending);
        inner.resolve(HostValue::from(5u32));
        let mut guest = MockGuest::new();
        while let Some(job) = tasks.pop() {
            run_job(job, &mut guest).unwrap();
        }
        assert_eq!(outer.status(), PromiseStatus::Fulfilled);
    }

    #[test]
    fn self_resolution_rejects() {
        let tasks = TaskQueue::new();
        let p = HostPromise::new(&tasks);
        p.resolve(HostValue::Promise(Arc::clone(&p)));
        assert_eq!(p.status(), PromiseStatus::Rejected);
    }
}
