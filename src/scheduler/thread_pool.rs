use futures::{executor::ThreadPool, future::abortable};

use super::{Duration, Scheduler, TaskHandle};

/// Runs tasks on a `futures` thread pool; timers are `futures-time` sleeps.
///
/// Repeating tasks sleep one period between runs, so they drift by the time
/// the task itself takes.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// A scheduler backed by a fresh pool with one thread per CPU.
  pub fn new() -> std::io::Result<Self> { ThreadPool::new().map(Self::from_pool) }

  pub fn from_pool(pool: ThreadPool) -> Self { Self { pool } }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.pool.spawn_ok(async move { task() });
  }

  fn schedule_after<F>(&self, delay: Duration, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let done = handle.clone();
    let (timer, abort) = abortable(async move {
      futures_time::task::sleep(delay.into()).await;
      if !done.is_closed() {
        done.mark_finished();
        task();
      }
    });
    handle.on_cancel(move || abort.abort());
    tracing::trace!(?delay, "task scheduled on thread pool");
    self.pool.spawn_ok(async move {
      let _ = timer.await;
    });
    handle
  }

  fn schedule_repeating<F>(&self, period: Duration, mut task: F) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    let handle = TaskHandle::new();
    let alive = handle.clone();
    let (ticker, abort) = abortable(async move {
      loop {
        futures_time::task::sleep(period.into()).await;
        if alive.is_closed() {
          break;
        }
        task();
      }
    });
    handle.on_cancel(move || abort.abort());
    tracing::trace!(?period, "repeating task scheduled on thread pool");
    self.pool.spawn_ok(async move {
      let _ = ticker.await;
    });
    handle
  }
}
