use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  scheduler::{Duration, Scheduler, TaskHandle},
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

/// Emits a value only after `quiet` has passed without another value.
///
/// The upstream is drained with unlimited demand. On `Finished` a value still
/// waiting for its quiet period is emitted first.
#[derive(Clone)]
pub struct Debounce<P, Sch> {
  pub(crate) source: P,
  pub(crate) quiet: Duration,
  pub(crate) scheduler: Sch,
}

impl<P, Sch> Publisher for Debounce<P, Sch>
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
    let node = Arc::new(DebounceNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      quiet: self.quiet,
      scheduler: self.scheduler,
      state: Mutex::new(DebounceState { pending: None, generation: 0, timer: None, terminated: false }),
    });
    node.outlet.attach(node.clone());
    node.upstream.request(Demand::Unlimited);
    self.source.subscribe(DebounceSubscriber(node));
  }
}

struct DebounceNode<T, E, S, Sch> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  quiet: Duration,
  scheduler: Sch,
  state: Mutex<DebounceState<T>>,
}

struct DebounceState<T> {
  pending: Option<T>,
  // Bumped on every value; a timer only fires for the generation it was
  // started for.
  generation: u64,
  timer: Option<TaskHandle>,
  terminated: bool,
}

impl<T, E, S, Sch> DebounceNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn restart(self: &Arc<Self>, value: T) {
    let (generation, previous) = {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      state.pending = Some(value);
      state.generation += 1;
      (state.generation, state.timer.take())
    };
    if let Some(previous) = previous {
      previous.cancel();
    }

    let weak: Weak<Self> = Arc::downgrade(self);
    let timer = self.scheduler.schedule_after(self.quiet, move || {
      if let Some(node) = weak.upgrade() {
        node.fire(generation);
      }
    });
    let mut state = self.state.lock();
    if state.generation == generation && !state.terminated && !timer.is_closed() {
      state.timer = Some(timer);
    }
  }

  fn fire(&self, generation: u64) {
    let value = {
      let mut state = self.state.lock();
      if state.generation != generation || state.terminated {
        return;
      }
      state.timer = None;
      state.pending.take()
    };
    if let Some(value) = value {
      self.outlet.push(value);
    }
  }

  /// Stops the timer and hands back the value still waiting, if any.
  fn stop(&self) -> Option<T> {
    let (pending, timer) = {
      let mut state = self.state.lock();
      state.terminated = true;
      (state.pending.take(), state.timer.take())
    };
    if let Some(timer) = timer {
      timer.cancel();
    }
    pending
  }
}

impl<T, E, S, Sch> Subscription for DebounceNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn request(&self, demand: Demand) { self.outlet.request(demand); }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
    self.stop();
  }
}

struct DebounceSubscriber<T, E, S, Sch>(Arc<DebounceNode<T, E, S, Sch>>);

impl<T, E, S, Sch> Subscriber<T, E> for DebounceSubscriber<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    self.0.restart(input);
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.upstream.release();
    let pending = self.0.stop();
    match completion {
      Completion::Finished => {
        if let Some(value) = pending {
          self.0.outlet.push(value);
        }
        self.0.outlet.complete(Completion::Finished);
      }
      Completion::Failed(err) => self.0.outlet.complete(Completion::Failed(err)),
    }
  }
}
