use tokio::runtime::Handle;

use super::{Duration, Scheduler, TaskHandle};

/// Runs tasks on a tokio runtime. The runtime needs its time driver enabled.
#[derive(Clone)]
pub struct TokioScheduler {
  runtime: Handle,
}

impl TokioScheduler {
  pub fn new(runtime: Handle) -> Self { Self { runtime } }

  /// The runtime the caller is running on.
  pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> { Handle::try_current().map(Self::new) }
}

impl Scheduler for TokioScheduler {
  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.runtime.spawn(async move { task() });
  }

  fn schedule_after<F>(&self, delay: Duration, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let done = handle.clone();
    let join = self.runtime.spawn(async move {
      tokio::time::sleep(delay).await;
      if !done.is_closed() {
        done.mark_finished();
        task();
      }
    });
    handle.on_cancel(move || join.abort());
    tracing::trace!(?delay, "task scheduled on tokio");
    handle
  }

  fn schedule_repeating<F>(&self, period: Duration, mut task: F) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let alive = handle.clone();
    let join = self.runtime.spawn(async move {
      let start = tokio::time::Instant::now() + period;
      let mut ticks = tokio::time::interval_at(start, period);
      loop {
        ticks.tick().await;
        if alive.is_closed() {
          break;
        }
        task();
      }
    });
    handle.on_cancel(move || join.abort());
    tracing::trace!(?period, "repeating task scheduled on tokio");
    handle
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn delayed_task_runs() {
    let scheduler = TokioScheduler::current().unwrap();
    let (tx, rx) = futures::channel::oneshot::channel();
    scheduler.schedule_after(Duration::from_millis(5), move || {
      let _ = tx.send(3);
    });
    assert_eq!(rx.await, Ok(3));
  }

  #[tokio::test]
  async fn cancel_aborts_the_timer() {
    let scheduler = TokioScheduler::current().unwrap();
    let (tx, rx) = futures::channel::oneshot::channel::<()>();
    let handle = scheduler.schedule_after(Duration::from_millis(20), move || {
      let _ = tx.send(());
    });
    handle.cancel();
    // The sender is dropped with the aborted task.
    assert!(rx.await.is_err());
  }
}
