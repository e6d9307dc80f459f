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

/// Which value of a throttle window is emitted when the window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThrottleEdge {
  #[default]
  First,
  Latest,
}

/// At most one value per `window`.
///
/// A window opens with the first value after an idle period and lasts
/// `window`; when it closes, its first or latest value (per [`ThrottleEdge`])
/// is emitted and the others are dropped. The upstream is drained with
/// unlimited demand. On `Finished`, the value of an open window is emitted
/// before finishing.
#[derive(Clone)]
pub struct Throttle<P, Sch> {
  pub(crate) source: P,
  pub(crate) window: Duration,
  pub(crate) scheduler: Sch,
  pub(crate) edge: ThrottleEdge,
}

impl<P, Sch> Publisher for Throttle<P, Sch>
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
    let node = Arc::new(ThrottleNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      window: self.window,
      scheduler: self.scheduler,
      edge: self.edge,
      state: Mutex::new(ThrottleState { candidate: None, timer: None, open: false, terminated: false }),
    });
    node.outlet.attach(node.clone());
    node.upstream.request(Demand::Unlimited);
    self.source.subscribe(ThrottleSubscriber(node));
  }
}

struct ThrottleNode<T, E, S, Sch> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  window: Duration,
  scheduler: Sch,
  edge: ThrottleEdge,
  state: Mutex<ThrottleState<T>>,
}

struct ThrottleState<T> {
  candidate: Option<T>,
  timer: Option<TaskHandle>,
  open: bool,
  terminated: bool,
}

impl<T, E, S, Sch> ThrottleNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn accept(self: &Arc<Self>, value: T) {
    {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      if state.open {
        if self.edge == ThrottleEdge::Latest {
          state.candidate = Some(value);
        }
        return;
      }
      state.open = true;
      state.candidate = Some(value);
    }

    let weak: Weak<Self> = Arc::downgrade(self);
    let timer = self.scheduler.schedule_after(self.window, move || {
      if let Some(node) = weak.upgrade() {
        node.close_window();
      }
    });
    let mut state = self.state.lock();
    if state.open && !timer.is_closed() {
      state.timer = Some(timer);
    }
  }

  fn close_window(&self) {
    let value = {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      state.open = false;
      state.timer = None;
      state.candidate.take()
    };
    if let Some(value) = value {
      self.outlet.push(value);
    }
  }

  fn stop(&self) -> Option<T> {
    let (candidate, timer) = {
      let mut state = self.state.lock();
      state.terminated = true;
      state.open = false;
      (state.candidate.take(), state.timer.take())
    };
    if let Some(timer) = timer {
      timer.cancel();
    }
    candidate
  }
}

impl<T, E, S, Sch> Subscription for ThrottleNode<T, E, S, Sch>
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

struct ThrottleSubscriber<T, E, S, Sch>(Arc<ThrottleNode<T, E, S, Sch>>);

impl<T, E, S, Sch> Subscriber<T, E> for ThrottleSubscriber<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    self.0.accept(input);
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.upstream.release();
    let candidate = self.0.stop();
    match completion {
      Completion::Finished => {
        if let Some(value) = candidate {
          self.0.outlet.push(value);
        }
        self.0.outlet.complete(Completion::Finished);
      }
      Completion::Failed(err) => self.0.outlet.complete(Completion::Failed(err)),
    }
  }
}
