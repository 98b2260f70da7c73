//! Cooperative task queue: microtasks, animation frames and host futures.
//!
//! Nothing here preempts the guest. Host operations that complete later
//! schedule work on the queue, and the lifecycle controller drains it
//! between guest calls on the same thread of control.

use crate::closure::GuestCalls;
use crate::error::Result;
use crate::promise::HostPromise;
use crate::table::ExternrefTable;
use crate::value::{HostResult, HostValue};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// How a promise settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Fulfilled with a value.
    Fulfilled(HostValue),
    /// Rejected with a reason.
    Rejected(HostValue),
}

impl Settlement {
    /// Whether this is a rejection.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The carried value or reason.
    pub fn value(&self) -> &HostValue {
        match self {
            Self::Fulfilled(v) | Self::Rejected(v) => v,
        }
    }
}

impl From<HostResult<HostValue>> for Settlement {
    fn from(result: HostResult<HostValue>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(reason) => Self::Rejected(reason),
        }
    }
}

/// A unit of deferred work.
pub enum Job {
    /// Promise continuation.
    Reaction {
        /// Guest callback to run, or `None` to pass the settlement through.
        handler: Option<HostValue>,
        /// The settlement being delivered.
        settlement: Settlement,
        /// Promise returned by the `then` that registered this reaction.
        derived: Arc<HostPromise>,
    },
    /// Plain callback, e.g. from `queueMicrotask`.
    Callback {
        /// Function to invoke.
        callback: HostValue,
        /// Arguments, interned as handles at invocation time.
        args: Vec<HostValue>,
    },
}

type PendingFuture = (Arc<HostPromise>, BoxFuture<'static, HostResult<HostValue>>);

#[derive(Default)]
struct QueueInner {
    jobs: VecDeque<Job>,
    frames: Vec<(u32, HostValue)>,
    next_frame: u32,
    futures: Vec<PendingFuture>,
    rejections: Vec<Arc<HostPromise>>,
}

/// Shared queue of deferred work.
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job.
    pub fn enqueue(&self, job: Job) {
        self.inner.lock().jobs.push_back(job);
    }

    /// Take the next job.
    pub fn pop(&self) -> Option<Job> {
        self.inner.lock().jobs.pop_front()
    }

    /// Number of queued jobs.
    pub fn pending_jobs(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    /// Schedule a callback as a microtask.
    pub fn queue_microtask(&self, callback: HostValue) {
        self.enqueue(Job::Callback {
            callback,
            args: Vec::new(),
        });
    }

    /// Register a callback for the next frame. Returns its id.
    pub fn request_animation_frame(&self, callback: HostValue) -> u32 {
        let mut inner = self.inner.lock();
        inner.next_frame += 1;
        let id = inner.next_frame;
        inner.frames.push((id, callback));
        id
    }

    /// Remove a pending frame callback.
    pub fn cancel_animation_frame(&self, id: u32) {
        self.inner.lock().frames.retain(|(frame, _)| *frame != id);
    }

    /// Number of frame callbacks waiting for the next tick.
    pub fn pending_frames(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Move every frame callback onto the microtask queue, passing the
    /// frame timestamp. Returns how many were scheduled.
    pub fn schedule_frame(&self, timestamp: f64) -> usize {
        let mut inner = self.inner.lock();
        let frames = std::mem::take(&mut inner.frames);
        let count = frames.len();
        for (_, callback) in frames {
            inner.jobs.push_back(Job::Callback {
                callback,
                args: vec![HostValue::Number(timestamp)],
            });
        }
        count
    }

    /// Attach a host future that settles `promise` when it completes.
    pub fn spawn(
        &self,
        promise: Arc<HostPromise>,
        future: BoxFuture<'static, HostResult<HostValue>>,
    ) {
        self.inner.lock().futures.push((promise, future));
    }

    /// Take every outstanding host future.
    pub fn take_futures(&self) -> Vec<PendingFuture> {
        std::mem::take(&mut self.inner.lock().futures)
    }

    /// Number of outstanding host futures.
    pub fn pending_futures(&self) -> usize {
        self.inner.lock().futures.len()
    }

    pub(crate) fn note_rejection(&self, promise: Arc<HostPromise>) {
        self.inner.lock().rejections.push(promise);
    }

    /// Rejected promises that still have no handler.
    pub fn take_unhandled(&self) -> Vec<Arc<HostPromise>> {
        let rejections = std::mem::take(&mut self.inner.lock().rejections);
        rejections.into_iter().filter(|p| !p.is_handled()).collect()
    }

    /// No jobs and no host futures outstanding. Frame callbacks do not
    /// count; they wait for the next tick.
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        inner.jobs.is_empty() && inner.futures.is_empty()
    }
}

/// Context handed to host objects while they service a call.
#[derive(Clone, Default)]
pub struct HostCx {
    tasks: TaskQueue,
}

impl HostCx {
    /// Create a context scheduling onto `tasks`.
    pub fn new(tasks: TaskQueue) -> Self {
        Self { tasks }
    }

    /// The task queue.
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// A new pending promise.
    pub fn promise(&self) -> Arc<HostPromise> {
        HostPromise::new(&self.tasks)
    }

    /// A promise already fulfilled with `value`.
    pub fn resolved(&self, value: HostValue) -> HostValue {
        let promise = self.promise();
        promise.resolve(value);
        HostValue::Promise(promise)
    }

    /// A promise already rejected with `reason`.
    pub fn rejected(&self, reason: HostValue) -> HostValue {
        let promise = self.promise();
        promise.reject(reason);
        HostValue::Promise(promise)
    }

    /// A promise settled by `future` when the event loop awaits it.
    pub fn spawn<F>(&self, future: F) -> HostValue
    where
        F: Future<Output = HostResult<HostValue>> + Send + 'static,
    {
        let promise = self.promise();
        self.tasks.spawn(Arc::clone(&promise), Box::pin(future));
        HostValue::Promise(promise)
    }
}

/// What running a job needs from the guest side.
pub trait GuestRuntime: GuestCalls {
    /// The externref table used to hand arguments to the guest.
    fn table_mut(&mut self) -> &mut ExternrefTable;
}

/// Run one job against the guest.
///
/// Handler arguments are interned into the table; the guest owns the
/// resulting handles. A handler that completes settles the derived promise
/// with undefined.
pub fn run_job<R: GuestRuntime + ?Sized>(job: Job, runtime: &mut R) -> Result<()> {
    match job {
        Job::Reaction {
            handler: None,
            settlement,
            derived,
        } => {
            derived.settle(settlement);
            Ok(())
        }
        Job::Reaction {
            handler: Some(handler),
            settlement,
            derived,
        } => {
            invoke(&handler, std::slice::from_ref(settlement.value()), runtime)?;
            derived.resolve(HostValue::Undefined);
            Ok(())
        }
        Job::Callback { callback, args } => invoke(&callback, &args, runtime),
    }
}

fn invoke<R: GuestRuntime + ?Sized>(
    callback: &HostValue,
    args: &[HostValue],
    runtime: &mut R,
) -> Result<()> {
    let HostValue::Function(closure) = callback else {
        tracing::warn!(
            kind = callback.type_name(),
            "scheduled callback is not a function; skipping"
        );
        return Ok(());
    };
    let handles = args
        .iter()
        .map(|arg| runtime.table_mut().intern(arg.clone()))
        .collect::<Result<Vec<u32>>>()?;
    closure.invoke(runtime, &handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::GuestClosure;
    use crate::promise::PromiseStatus;
    use crate::testing::MockGuest;

    #[test]
    fn reaction_invokes_guest_handler_with_interned_value() {
        let mut guest = MockGuest::new();
        let tasks = TaskQueue::new();
        let handler = GuestClosure::new(1, 2, 3, 4, guest.finalizers());
        let p = HostPromise::new(&tasks);
        let derived = p.then(Some(HostValue::Function(handler)), None);

        p.resolve(HostValue::from("adapter"));
        run_job(tasks.pop().unwrap(), &mut guest).unwrap();

        let calls = guest.calls_for(4);
        let call = &calls[0];
        assert_eq!(call.args[..2], [1, 2]);
        let handle = call.args[2];
        assert_eq!(guest.table().get(handle).unwrap().as_str(), Some("adapter"));
        assert_eq!(derived.status(), PromiseStatus::Fulfilled);
    }

    #[test]
    fn rejection_without_handler_propagates() {
        let mut guest = MockGuest::new();
        let tasks = TaskQueue::new();
        let handler = GuestClosure::new(1, 2, 3, 4, guest.finalizers());
        let p = HostPromise::new(&tasks);
        let derived = p.then(Some(HostValue::Function(handler)), None);
        p.reject(HostValue::from("lost"));
        run_job(tasks.pop().unwrap(), &mut guest).unwrap();
        assert_eq!(derived.status(), PromiseStatus::Rejected);
        assert!(guest.calls().is_empty());
    }

    #[test]
    fn animation_frames_run_on_tick() {
        let mut guest = MockGuest::new();
        let tasks = TaskQueue::new();
        let cb = HostValue::Function(GuestClosure::new(1, 2, 3, 4, guest.finalizers()));
        let keep = tasks.request_animation_frame(cb.clone());
        let cancelled = tasks.request_animation_frame(cb);
        tasks.cancel_animation_frame(cancelled);
        assert_ne!(keep, cancelled);
        assert_eq!(tasks.schedule_frame(16.0), 1);
        assert_eq!(tasks.pending_frames(), 0);
        run_job(tasks.pop().unwrap(), &mut guest).unwrap();
        let handle = guest.calls_for(4)[0].args[2];
        assert_eq!(guest.table().get(handle).unwrap().as_f64(), Some(16.0));
    }

    #[tokio::test]
    async fn spawned_future_settles_promise_when_awaited() {
        let tasks = TaskQueue::new();
        let cx = HostCx::new(tasks.clone());
        let value = cx.spawn(async { Ok(HostValue::from(42u32)) });
        let HostValue::Promise(promise) = value else {
            panic!("expected promise");
        };
        assert!(!tasks.is_idle());
        for (p, fut) in tasks.take_futures() {
            p.settle(fut.await.into());
        }
        assert_eq!(promise.status(), PromiseStatus::Fulfilled);
        assert!(tasks.is_idle());
    }
}
