use super::{Duration, Scheduler, TaskHandle};

/// Runs every task inline on the calling thread.
///
/// Delays are ignored: `schedule_after` runs the task before returning, and
/// `schedule_repeating` runs it exactly once, since repeating inline would
/// never return. Useful for chains that need a scheduler argument but no
/// actual deferral.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    task()
  }

  fn schedule_after<F>(&self, _delay: Duration, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    task();
    TaskHandle::finished()
  }

  fn schedule_repeating<F>(&self, _period: Duration, mut task: F) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    task();
    TaskHandle::finished()
  }
}
