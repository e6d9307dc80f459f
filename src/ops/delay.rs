use std::{
  collections::VecDeque,
  sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  scheduler::{Duration, Scheduler, TaskHandle},
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

/// Shifts every value and the `Finished` completion `delay` later on
/// `scheduler`, keeping their order. Demand is forwarded upstream 1:1.
///
/// A failure is not delayed: pending values are dropped, their timers
/// cancelled, and the failure delivered right away.
#[derive(Clone)]
pub struct Delay<P, Sch> {
  pub(crate) source: P,
  pub(crate) delay: Duration,
  pub(crate) scheduler: Sch,
}

impl<P, Sch> Publisher for Delay<P, Sch>
where
  P: Publisher,
  Sch: Scheduler,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    let node = Arc::new(DelayNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      delay: self.delay,
      scheduler: self.scheduler,
      state: Mutex::new(DelayState { due: VecDeque::new(), timers: Vec::new(), terminated: false }),
    });
    node.outlet.attach(node.clone());
    self.source.subscribe(DelaySubscriber(node));
  }
}

enum Delayed<T> {
  Value(T),
  Finished,
}

struct DelayNode<T, E, S, Sch> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  delay: Duration,
  scheduler: Sch,
  state: Mutex<DelayState<T>>,
}

struct DelayState<T> {
  // Signals in arrival order; every timer releases the oldest one, so order
  // holds even if the scheduler fires equal deadlines out of order.
  due: VecDeque<Delayed<T>>,
  timers: Vec<TaskHandle>,
  terminated: bool,
}

impl<T, E, S, Sch> DelayNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn postpone(self: &Arc<Self>, signal: Delayed<T>) {
    {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      state.due.push_back(signal);
    }
    let weak: Weak<Self> = Arc::downgrade(self);
    let timer = self.scheduler.schedule_after(self.delay, move || {
      if let Some(node) = weak.upgrade() {
        node.release_oldest();
      }
    });
    if !timer.is_closed() {
      self.state.lock().timers.push(timer);
    }
  }

  fn release_oldest(&self) {
    let signal = {
      let mut state = self.state.lock();
      state.timers.retain(|timer| !timer.is_closed());
      state.due.pop_front()
    };
    match signal {
      Some(Delayed::Value(value)) => {
        let extra = self.outlet.push(value);
        self.upstream.request(extra);
      }
      Some(Delayed::Finished) => self.outlet.complete(Completion::Finished),
      None => {}
    }
  }

  fn stop_timers(&self) {
    let timers = {
      let mut state = self.state.lock();
      state.terminated = true;
      state.due.clear();
      std::mem::take(&mut state.timers)
    };
    for timer in timers {
      timer.cancel();
    }
  }
}

impl<T, E, S, Sch> Subscription for DelayNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn request(&self, demand: Demand) {
    let extra = self.outlet.request(demand);
    self.upstream.request(demand + extra);
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
    self.stop_timers();
  }
}

struct DelaySubscriber<T, E, S, Sch>(Arc<DelayNode<T, E, S, Sch>>);

impl<T, E, S, Sch> Subscriber<T, E> for DelaySubscriber<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    self.0.postpone(Delayed::Value(input));
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.upstream.release();
    match completion {
      Completion::Finished => self.0.postpone(Delayed::Finished),
      Completion::Failed(err) => {
        self.0.stop_timers();
        self.0.outlet.complete(Completion::Failed(err));
      }
    }
  }
}
