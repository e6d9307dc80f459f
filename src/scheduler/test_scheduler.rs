//! Virtual-time scheduler for deterministic tests of time-based operators.
//!
//! Time only moves when the test says so. Advancing runs every task that
//! becomes due, in order of due time, FIFO among tasks due at the same
//! instant.
//!
//! ```rust
//! use rxflow::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let (subject, values) = (PublishSubject::<i32>::new(), MutArc::own(vec![]));
//! let sink = values.clone();
//! let _guard = subject
//!   .clone()
//!   .delay(Duration::from_millis(100), scheduler.clone())
//!   .sink_value(move |v| sink.lock().push(v))
//!   .cancel_when_dropped();
//!
//! subject.send(42);
//! assert!(values.lock().is_empty());
//! scheduler.advance_by(Duration::from_millis(100));
//! assert_eq!(*values.lock(), vec![42]);
//! ```
//!
//! Unlike thread-bound virtual clocks, a `TestScheduler` is an explicit
//! instance: clones share one clock, separate instances are independent.

use std::{cmp::Ordering, collections::BinaryHeap};

use super::{Duration, Scheduler, TaskHandle};
use crate::rc::MutArc;

#[derive(Clone, Default)]
pub struct TestScheduler {
  clock: MutArc<Clock>,
}

#[derive(Default)]
struct Clock {
  now: Duration,
  queue: BinaryHeap<ScheduledTask>,
  next_id: usize,
}

enum Job {
  Once(Box<dyn FnOnce() + Send>),
  Repeating { period: Duration, task: Box<dyn FnMut() + Send> },
}

struct ScheduledTask {
  due: Duration,
  id: usize,
  handle: TaskHandle,
  job: Job,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.id == other.id }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by id
    other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
  }
}

impl Clock {
  fn push(&mut self, due: Duration, handle: TaskHandle, job: Job) {
    let id = self.next_id;
    self.next_id += 1;
    self.queue.push(ScheduledTask { due, id, handle, job });
  }

  fn has_pending_once(&self) -> bool {
    self.queue.iter().any(|task| matches!(task.job, Job::Once(_)) && !task.handle.is_closed())
  }
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time, measured from the scheduler's creation.
  pub fn now(&self) -> Duration { self.clock.lock().now }

  /// Number of scheduled tasks that have not run or been cancelled.
  pub fn pending_count(&self) -> usize {
    self.clock.lock().queue.iter().filter(|task| !task.handle.is_closed()).count()
  }

  /// Move time forward by `duration`, running everything that becomes due.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.now() + duration;
    self.advance_to(target);
  }

  /// Move time forward to `instant`. Moving backwards is a no-op.
  pub fn advance_to(&self, instant: Duration) {
    self.run_until(|clock| clock.queue.peek().is_some_and(|task| task.due <= instant));
    let mut clock = self.clock.lock();
    if clock.now < instant {
      clock.now = instant;
    }
  }

  /// Run every task that is due now without moving time.
  pub fn run_pending(&self) { self.advance_by(Duration::ZERO) }

  /// Run until no one-shot task is left, jumping time to each due task.
  ///
  /// Repeating tasks run as time passes but do not keep `flush` going on
  /// their own.
  pub fn flush(&self) { self.run_until(Clock::has_pending_once) }

  fn run_until(&self, mut keep_going: impl FnMut(&Clock) -> bool) {
    loop {
      let task = {
        let mut clock = self.clock.lock();
        if !keep_going(&clock) {
          return;
        }
        let Some(task) = clock.queue.pop() else { return };
        if task.handle.is_closed() {
          continue;
        }
        if clock.now < task.due {
          clock.now = task.due;
        }
        task
      };

      // Tasks run without the clock locked, they usually schedule more work.
      let ScheduledTask { due, handle, job, .. } = task;
      match job {
        Job::Once(task) => {
          handle.mark_finished();
          task();
        }
        Job::Repeating { period, mut task } => {
          task();
          if !handle.is_closed() {
            self.clock.lock().push(due + period, handle, Job::Repeating { period, task });
          }
        }
      }
    }
  }

  fn enqueue(&self, delay: Duration, job: Job) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut clock = self.clock.lock();
    let due = clock.now + delay;
    tracing::trace!(?due, "virtual task scheduled");
    clock.push(due, handle.clone(), job);
    handle
  }
}

impl Scheduler for TestScheduler {
  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.enqueue(Duration::ZERO, Job::Once(Box::new(task)));
  }

  fn schedule_after<F>(&self, delay: Duration, task: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.enqueue(delay, Job::Once(Box::new(task)))
  }

  fn schedule_repeating<F>(&self, period: Duration, task: F) -> TaskHandle
  where
    F: FnMut() + Send + 'static,
  {
    // A zero period would make every advance spin forever.
    let period = period.max(Duration::from_nanos(1));
    self.enqueue(period, Job::Repeating { period, task: Box::new(task) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn recorder() -> (MutArc<Vec<&'static str>>, impl Fn(&'static str) -> Box<dyn FnOnce() + Send>) {
    let log = MutArc::own(vec![]);
    let l = log.clone();
    (log, move |tag| {
      let l = l.clone();
      Box::new(move || l.lock().push(tag))
    })
  }

  #[test]
  fn runs_in_due_order_fifo_within_an_instant() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    scheduler.schedule_after(Duration::from_millis(20), task("c"));
    scheduler.schedule_after(Duration::from_millis(10), task("a"));
    scheduler.schedule_after(Duration::from_millis(10), task("b"));

    scheduler.advance_by(Duration::from_millis(9));
    assert!(log.lock().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(*log.lock(), vec!["a", "b"]);
    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    assert_eq!(scheduler.now(), Duration::from_millis(20));
  }

  #[test]
  fn cancelled_task_does_not_run() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    let handle = scheduler.schedule_after(Duration::from_millis(5), task("x"));
    assert_eq!(scheduler.pending_count(), 1);
    handle.cancel();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.flush();
    assert!(log.lock().is_empty());
  }

  #[test]
  fn repeating_task_fires_every_period() {
    let scheduler = TestScheduler::new();
    let ticks = MutArc::own(0);
    let t = ticks.clone();
    let handle = scheduler.schedule_repeating(Duration::from_secs(1), move || *t.lock() += 1);
    scheduler.advance_by(Duration::from_millis(3500));
    assert_eq!(*ticks.lock(), 3);
    handle.cancel();
    scheduler.advance_by(Duration::from_secs(10));
    assert_eq!(*ticks.lock(), 3);
  }

  #[test]
  fn flush_ignores_lone_repeating_tasks() {
    let scheduler = TestScheduler::new();
    let (log, task) = recorder();
    let _tick = scheduler.schedule_repeating(Duration::from_secs(1), || {});
    scheduler.schedule_after(Duration::from_secs(3), task("done"));
    scheduler.flush();
    assert_eq!(*log.lock(), vec!["done"]);
    assert_eq!(scheduler.now(), Duration::from_secs(3));
  }

  #[test]
  fn tasks_may_schedule_more_work() {
    let scheduler = TestScheduler::new();
    let log = MutArc::own(vec![]);
    let (inner_scheduler, l) = (scheduler.clone(), log.clone());
    scheduler.schedule(move || {
      l.lock().push(inner_scheduler.now());
      let l = l.clone();
      let s = inner_scheduler.clone();
      inner_scheduler.schedule_after(Duration::from_millis(7), move || l.lock().push(s.now()));
    });
    scheduler.run_pending();
    assert_eq!(*log.lock(), vec![Duration::ZERO]);
    scheduler.flush();
    assert_eq!(*log.lock(), vec![Duration::ZERO, Duration::from_millis(7)]);
  }

  #[test]
  fn clones_share_a_clock() {
    let a = TestScheduler::new();
    let b = a.clone();
    a.advance_by(Duration::from_secs(2));
    assert_eq!(b.now(), Duration::from_secs(2));
    assert_eq!(TestScheduler::new().now(), Duration::ZERO);
  }
}
