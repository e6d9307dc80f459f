use std::{
  convert::Infallible,
  sync::{Arc, Weak},
};

use parking_lot::Mutex;

use super::Publisher;
use crate::{
  demand::Demand,
  outlet::Outlet,
  scheduler::{Duration, Scheduler, TaskHandle},
  subscriber::Subscriber,
  subscription::Subscription,
};

/// Emits the tick index every `period` on `scheduler`. Never completes.
///
/// Ticks are not buffered: a tick that finds no outstanding demand is dropped,
/// so a slow subscriber sees gaps in the sequence rather than a backlog.
pub fn interval<Sch: Scheduler>(period: Duration, scheduler: Sch) -> Interval<Sch> {
  Interval { period, scheduler }
}

#[derive(Clone)]
pub struct Interval<Sch> {
  period: Duration,
  scheduler: Sch,
}

impl<Sch: Scheduler> Publisher for Interval<Sch> {
  type Output = u64;
  type Failure = Infallible;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<u64, Infallible>,
  {
    let node = Arc::new(IntervalNode { outlet: Outlet::new(subscriber), ticks: Mutex::new(None) });
    node.outlet.attach(node.clone());
    if node.outlet.is_closed() {
      return;
    }

    let weak: Weak<IntervalNode<S>> = Arc::downgrade(&node);
    let mut tick = 0u64;
    let handle = self.scheduler.schedule_repeating(self.period, move || {
      if let Some(node) = weak.upgrade() {
        node.outlet.offer(tick);
      }
      tick += 1;
    });
    *node.ticks.lock() = Some(handle.clone());
    // Cancelled between attach and here.
    if node.outlet.is_closed() {
      handle.cancel();
    }
  }
}

struct IntervalNode<S> {
  outlet: Outlet<u64, Infallible, S>,
  ticks: Mutex<Option<TaskHandle>>,
}

impl<S> Subscription for IntervalNode<S>
where
  S: Subscriber<u64, Infallible>,
{
  fn request(&self, demand: Demand) { self.outlet.request(demand); }

  fn cancel(&self) {
    self.outlet.cancel();
    let ticks = self.ticks.lock().take();
    if let Some(ticks) = ticks {
      ticks.cancel();
    }
  }
}

impl<S> Drop for IntervalNode<S> {
  fn drop(&mut self) {
    if let Some(ticks) = self.ticks.get_mut().take() {
      ticks.cancel();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{scheduler::TestScheduler, testing::TestSubscriber};

  #[test]
  fn ticks_on_each_period() {
    let scheduler = TestScheduler::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    interval(Duration::from_secs(1), scheduler.clone()).subscribe(subscriber);
    scheduler.advance_by(Duration::from_millis(3500));
    assert_eq!(recorder.values(), vec![0, 1, 2]);
    assert!(!recorder.is_completed());
  }

  #[test]
  fn ticks_without_demand_are_dropped() {
    let scheduler = TestScheduler::new();
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(1));
    interval(Duration::from_secs(1), scheduler.clone()).subscribe(subscriber);
    scheduler.advance_by(Duration::from_secs(3));
    assert_eq!(recorder.values(), vec![0]);

    recorder.request(Demand::max(1));
    scheduler.advance_by(Duration::from_secs(1));
    assert_eq!(recorder.values(), vec![0, 3]);
  }

  #[test]
  fn cancel_stops_the_timer() {
    let scheduler = TestScheduler::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    interval(Duration::from_secs(1), scheduler.clone()).subscribe(subscriber);
    scheduler.advance_by(Duration::from_secs(1));
    recorder.cancel();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.advance_by(Duration::from_secs(5));
    assert_eq!(recorder.values(), vec![0]);
  }
}
