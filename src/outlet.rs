//! Serialized, demand-aware delivery to one downstream subscriber.
//!
//! Operators whose output is not a 1:1 image of a single upstream (combinators,
//! timing operators, subjects, `flat_map`, ...) produce values from several
//! places: different upstreams, scheduler callbacks, downstream requests.
//! [`Outlet`] is the one place those values meet the downstream subscriber.
//!
//! * Whoever finds the outlet idle takes the *drain token* and delivers
//!   everything that is deliverable; everyone else just enqueues and leaves.
//!   The downstream subscriber is therefore never called concurrently, and
//!   calls made back into the operator from inside `receive` (request, cancel,
//!   pushing more values) never deadlock.
//! * A value is delivered only against outstanding demand; extra demand
//!   returned by `receive` is added back and reported to the caller so the
//!   operator can forward it upstream.
//! * A failure pre-empts queued values, a finish waits for them. A failure
//!   that arrives while a finish is still pending replaces it.
//! * After the completion has been delivered, or after `cancel`, everything is
//!   ignored and the downstream subscriber is released.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

pub(crate) struct Outlet<T, E, S> {
  state: Mutex<OutletState<T, E>>,
  downstream: Mutex<Option<S>>,
}

struct OutletState<T, E> {
  subscription: Option<SubscriptionRef>,
  queue: VecDeque<T>,
  completion: Option<Completion<E>>,
  demand: Demand,
  draining: bool,
  terminated: bool,
  cancelled: bool,
}

enum Step<T, E> {
  Subscribe(SubscriptionRef),
  Value(T),
  Complete(Completion<E>),
  Release,
  Idle,
}

impl<T, E> OutletState<T, E> {
  fn is_closed(&self) -> bool { self.cancelled || self.terminated || self.completion.is_some() }

  fn available(&self) -> Demand { self.demand - self.queue.len() }

  /// Take the drain token. `false` means somebody else is draining.
  fn begin(&mut self) -> bool { !std::mem::replace(&mut self.draining, true) }

  fn next_step(&mut self) -> Step<T, E> {
    if self.cancelled {
      // A cancelled outlet keeps the token forever.
      return Step::Release;
    }
    if let Some(subscription) = self.subscription.take() {
      return Step::Subscribe(subscription);
    }
    if self.terminated {
      self.draining = false;
      return Step::Idle;
    }
    let failed = self.completion.as_ref().is_some_and(Completion::is_failure);
    if failed || self.queue.is_empty() {
      if let Some(completion) = self.completion.take() {
        self.queue.clear();
        self.terminated = true;
        return Step::Complete(completion);
      }
    }
    if !self.queue.is_empty() && self.demand.take_one() {
      if let Some(value) = self.queue.pop_front() {
        return Step::Value(value);
      }
    }
    self.draining = false;
    Step::Idle
  }
}

impl<T, E, S> Outlet<T, E, S>
where
  S: Subscriber<T, E>,
{
  pub(crate) fn new(downstream: S) -> Self {
    Self {
      state: Mutex::new(OutletState {
        subscription: None,
        queue: VecDeque::new(),
        completion: None,
        demand: Demand::NONE,
        draining: false,
        terminated: false,
        cancelled: false,
      }),
      downstream: Mutex::new(Some(downstream)),
    }
  }

  /// Hand `subscription` to the downstream subscriber.
  pub(crate) fn attach(&self, subscription: SubscriptionRef) -> Demand {
    {
      let mut state = self.state.lock();
      if state.cancelled {
        return Demand::NONE;
      }
      state.subscription = Some(subscription);
      if !state.begin() {
        return Demand::NONE;
      }
    }
    self.drain()
  }

  /// Record demand granted by the downstream subscriber.
  pub(crate) fn request(&self, demand: Demand) -> Demand {
    {
      let mut state = self.state.lock();
      if state.cancelled || state.terminated || demand.is_none() {
        return Demand::NONE;
      }
      state.demand += demand;
      if !state.begin() {
        return Demand::NONE;
      }
    }
    self.drain()
  }

  /// Queue `value` for delivery, buffering it if there is no demand.
  pub(crate) fn push(&self, value: T) -> Demand {
    {
      let mut state = self.state.lock();
      if state.is_closed() {
        return Demand::NONE;
      }
      state.queue.push_back(value);
      if !state.begin() {
        return Demand::NONE;
      }
    }
    self.drain()
  }

  /// Deliver `value` only if demand is available for it; otherwise it is
  /// dropped.
  pub(crate) fn offer(&self, value: T) -> Demand {
    {
      let mut state = self.state.lock();
      if state.is_closed() || state.available().is_none() {
        return Demand::NONE;
      }
      state.queue.push_back(value);
      if !state.begin() {
        return Demand::NONE;
      }
    }
    self.drain()
  }

  /// Queue `value` without delivering; the next `request` delivers it.
  pub(crate) fn enqueue(&self, value: T) -> bool {
    let mut state = self.state.lock();
    if state.is_closed() {
      return false;
    }
    state.queue.push_back(value);
    true
  }

  /// Terminate the stream. A finish is delivered once the queue has drained;
  /// a failure right away.
  pub(crate) fn complete(&self, completion: Completion<E>) {
    {
      let mut state = self.state.lock();
      if state.cancelled || state.terminated {
        return;
      }
      let replace = match &state.completion {
        None => true,
        Some(pending) => !pending.is_failure() && completion.is_failure(),
      };
      if !replace {
        return;
      }
      state.completion = Some(completion);
      if !state.begin() {
        return;
      }
    }
    self.drain();
  }

  /// Stop delivering and release the downstream subscriber. Idempotent.
  pub(crate) fn cancel(&self) {
    let release = {
      let mut state = self.state.lock();
      if state.cancelled || state.terminated {
        return;
      }
      state.cancelled = true;
      state.queue.clear();
      state.completion = None;
      state.begin()
    };
    if release {
      let downstream = self.downstream.lock().take();
      drop(downstream);
    }
  }

  /// Terminated, cancelled, or with a completion pending.
  pub(crate) fn is_closed(&self) -> bool { self.state.lock().is_closed() }

  #[cfg(test)]
  pub(crate) fn queued(&self) -> usize { self.state.lock().queue.len() }

  fn drain(&self) -> Demand {
    let mut extra = Demand::NONE;
    loop {
      let step = self.state.lock().next_step();
      match step {
        Step::Subscribe(subscription) => {
          if let Some(downstream) = self.downstream.lock().as_mut() {
            downstream.receive_subscription(subscription);
          }
        }
        Step::Value(value) => {
          let more = match self.downstream.lock().as_mut() {
            Some(downstream) => downstream.receive(value),
            None => Demand::NONE,
          };
          if !more.is_none() {
            self.state.lock().demand += more;
            extra += more;
          }
        }
        Step::Complete(completion) => {
          let downstream = self.downstream.lock().take();
          if let Some(downstream) = downstream {
            downstream.receive_completion(completion);
          }
        }
        Step::Release => {
          let downstream = self.downstream.lock().take();
          drop(downstream);
          return extra;
        }
        Step::Idle => return extra,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{convert::Infallible, sync::Arc};

  use super::*;
  use crate::{
    subscription::EmptySubscription,
    testing::{Event, TestSubscriber},
  };

  fn new_outlet<T: Send + 'static, E: Send + 'static>(
    initial: Demand,
  ) -> (Arc<Outlet<T, E, TestSubscriber<T, E>>>, crate::testing::Recorder<T, E>) {
    let (subscriber, recorder) = TestSubscriber::new(initial);
    let outlet = Arc::new(Outlet::new(subscriber));
    (outlet, recorder)
  }

  #[test]
  fn buffers_until_demand_arrives() {
    let (outlet, recorder) = new_outlet::<i32, Infallible>(Demand::NONE);
    outlet.attach(EmptySubscription::shared());
    outlet.push(1);
    outlet.push(2);
    assert_eq!(recorder.value_count(), 0);
    assert_eq!(outlet.queued(), 2);

    recorder.request(Demand::max(1));
    outlet.request(Demand::max(1));
    assert_eq!(recorder.values(), vec![1]);
    assert_eq!(outlet.queued(), 1);
  }

  #[test]
  fn offer_drops_without_demand() {
    let (outlet, recorder) = new_outlet::<i32, Infallible>(Demand::NONE);
    outlet.attach(EmptySubscription::shared());
    outlet.offer(1);
    recorder.request(Demand::max(1));
    outlet.request(Demand::max(1));
    outlet.offer(2);
    outlet.offer(3);
    assert_eq!(recorder.values(), vec![2]);
  }

  #[test]
  fn finish_waits_for_queue_failure_does_not() {
    let (outlet, recorder) = new_outlet::<i32, &str>(Demand::NONE);
    outlet.attach(EmptySubscription::shared());
    outlet.push(1);
    outlet.complete(Completion::Finished);
    assert!(!recorder.is_completed());
    recorder.request(Demand::max(1));
    outlet.request(Demand::max(1));
    assert_eq!(
      recorder.events(),
      vec![Event::Subscribed, Event::Value(1), Event::Completion(Completion::Finished)]
    );

    let (outlet, recorder) = new_outlet::<i32, &str>(Demand::NONE);
    outlet.attach(EmptySubscription::shared());
    outlet.push(1);
    outlet.complete(Completion::Failed("boom"));
    assert_eq!(recorder.events(), vec![Event::Subscribed, Event::Completion(Completion::Failed("boom"))]);
  }

  #[test]
  fn failure_replaces_pending_finish() {
    let (outlet, recorder) = new_outlet::<i32, &str>(Demand::NONE);
    outlet.attach(EmptySubscription::shared());
    outlet.push(1);
    outlet.complete(Completion::Finished);
    outlet.complete(Completion::Failed("late failure"));
    outlet.complete(Completion::Failed("ignored"));
    assert_eq!(recorder.failure(), Some("late failure"));
  }

  #[test]
  fn cancel_releases_and_ignores_everything_after() {
    let (outlet, recorder) = new_outlet::<i32, Infallible>(Demand::Unlimited);
    outlet.attach(EmptySubscription::shared());
    outlet.request(Demand::Unlimited);
    outlet.push(1);
    outlet.cancel();
    outlet.push(2);
    outlet.complete(Completion::Finished);
    assert_eq!(recorder.events(), vec![Event::Subscribed, Event::Value(1)]);
    assert!(outlet.is_closed());
  }

  struct Reentrant {
    outlet: Arc<Outlet<i32, Infallible, crate::testing::TestSubscriber<i32, Infallible>>>,
  }

  #[test]
  fn reentrant_push_is_delivered_after_current_value() {
    let (outlet, recorder) = new_outlet::<i32, Infallible>(Demand::Unlimited);
    outlet.attach(EmptySubscription::shared());
    outlet.request(Demand::Unlimited);
    let helper = Reentrant { outlet: outlet.clone() };
    // Simulate a push arriving while the drain token is held.
    {
      let mut state = helper.outlet.state.lock();
      assert!(state.begin());
    }
    helper.outlet.push(1);
    helper.outlet.push(2);
    assert_eq!(recorder.value_count(), 0);
    helper.outlet.drain();
    assert_eq!(recorder.values(), vec![1, 2]);
  }
}
