//! Where and when deferred work runs.
//!
//! Timing operators never spawn threads or sleep themselves: they receive a
//! [`Scheduler`] and ask it to run closures now, after a delay, or
//! periodically. There is no process-wide default scheduler; pick one
//! explicitly per chain:
//!
//! - [`ImmediateScheduler`] runs everything inline on the calling thread.
//! - [`TestScheduler`] keeps virtual time that only moves when a test says so.
//! - `ThreadPoolScheduler` (feature `futures-scheduler`) runs on a `futures`
//!   thread pool.
//! - `TokioScheduler` (feature `tokio-scheduler`) runs on a tokio runtime.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;
pub use std::time::Duration;

use crate::{demand::Demand, subscription::Subscription};

mod immediate;
mod test_scheduler;
#[cfg(feature = "futures-scheduler")]
mod thread_pool;
#[cfg(feature = "tokio-scheduler")]
mod tokio_runtime;

pub use immediate::ImmediateScheduler;
pub use test_scheduler::TestScheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_runtime::TokioScheduler;

/// Runs work now, later, or periodically.
///
/// Schedulers are cheap handles: cloning one yields another handle to the same
/// execution context.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Run `task` as soon as the execution context allows.
  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static;

  /// Run `task` once after `delay`. Cancelling the handle before it fires
  /// prevents it from running.
  fn schedule_after<F>(&self, delay: Duration, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static;

  /// Run `task` every `period`, first after one period, until the handle is
  /// cancelled.
  fn schedule_repeating<F>(&self, period: Duration, task: F) -> TaskHandle
  where
    F: FnMut() + Send + 'static;
}

/// Cancellation handle for scheduled work.
///
/// Cloning shares the same task. A handle is *closed* once the task has
/// finished or has been cancelled.
#[derive(Clone)]
pub struct TaskHandle {
  inner: Option<Arc<HandleState>>,
}

struct HandleState {
  closed: AtomicBool,
  on_cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl TaskHandle {
  pub fn new() -> Self {
    Self {
      inner: Some(Arc::new(HandleState { closed: AtomicBool::new(false), on_cancel: Mutex::new(None) })),
    }
  }

  /// A handle for work that already ran.
  pub fn finished() -> Self { Self { inner: None } }

  pub fn is_closed(&self) -> bool {
    match &self.inner {
      Some(state) => state.closed.load(Ordering::Acquire),
      None => true,
    }
  }

  /// Cancel the task. Idempotent; a no-op once the task has finished.
  pub fn cancel(&self) {
    let Some(state) = &self.inner else { return };
    if state.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    tracing::trace!("scheduled task cancelled");
    let hook = state.on_cancel.lock().take();
    if let Some(hook) = hook {
      hook();
    }
  }

  /// Mark the task as done; the cancel hook is discarded.
  pub fn mark_finished(&self) {
    if let Some(state) = &self.inner {
      state.closed.store(true, Ordering::Release);
      state.on_cancel.lock().take();
    }
  }

  /// Register what cancelling has to do for the underlying runtime (abort a
  /// future, a join handle, ...). Runs right away if the handle is already
  /// closed.
  pub(crate) fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
    let Some(state) = &self.inner else {
      hook();
      return;
    };
    let mut slot = state.on_cancel.lock();
    if state.closed.load(Ordering::Acquire) {
      drop(slot);
      hook();
    } else {
      *slot = Some(Box::new(hook));
    }
  }
}

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl Subscription for TaskHandle {
  fn request(&self, _demand: Demand) {}

  fn cancel(&self) { TaskHandle::cancel(self) }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;

  #[test]
  fn cancel_runs_hook_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = TaskHandle::new();
    let counter = hits.clone();
    handle.on_cancel(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    handle.cancel();
    handle.clone().cancel();
    assert!(handle.is_closed());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn hook_registered_after_cancel_runs_immediately() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = TaskHandle::new();
    handle.cancel();
    let counter = hits.clone();
    handle.on_cancel(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn finished_task_ignores_cancel() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = TaskHandle::new();
    let counter = hits.clone();
    handle.on_cancel(move || {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    handle.mark_finished();
    handle.cancel();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(TaskHandle::finished().is_closed());
  }
}
