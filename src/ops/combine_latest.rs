//! CombineLatest: the latest value of every input, re-emitted whenever any
//! input produces.
//!
//! Both inputs are drained with unlimited demand. Combinations the downstream
//! has not asked for yet wait in the outlet, in order.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

#[derive(Clone)]
pub struct CombineLatest<A, B> {
  pub(crate) a: A,
  pub(crate) b: B,
}

impl<A, B> Publisher for CombineLatest<A, B>
where
  A: Publisher,
  A::Output: Clone,
  B: Publisher<Failure = A::Failure>,
  B::Output: Clone,
{
  type Output = (A::Output, B::Output);
  type Failure = A::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<(A::Output, B::Output), A::Failure>,
  {
    let node = Arc::new(CombineNode {
      outlet: Outlet::new(subscriber),
      left: Upstream::new(),
      right: Upstream::new(),
      state: Mutex::new(CombineState {
        left: None,
        right: None,
        left_done: false,
        right_done: false,
        terminated: false,
      }),
    });
    node.outlet.attach(node.clone());
    node.left.request(Demand::Unlimited);
    node.right.request(Demand::Unlimited);
    self.a.subscribe(CombineLeft(node.clone()));
    self.b.subscribe(CombineRight(node));
  }
}

struct CombineNode<L, R, E, S> {
  outlet: Outlet<(L, R), E, S>,
  left: Upstream,
  right: Upstream,
  state: Mutex<CombineState<L, R>>,
}

struct CombineState<L, R> {
  left: Option<L>,
  right: Option<R>,
  left_done: bool,
  right_done: bool,
  terminated: bool,
}

impl<L, R> CombineState<L, R>
where
  L: Clone,
  R: Clone,
{
  fn latest(&self) -> Option<(L, R)> {
    match (&self.left, &self.right) {
      (Some(left), Some(right)) => Some((left.clone(), right.clone())),
      _ => None,
    }
  }
}

impl<L, R, E, S> CombineNode<L, R, E, S>
where
  L: Clone + Send + 'static,
  R: Clone + Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn finish_if_done(&self) {
    let done = {
      let mut state = self.state.lock();
      let done = state.left_done && state.right_done && !state.terminated;
      state.terminated |= done;
      done
    };
    if done {
      self.outlet.complete(Completion::Finished);
    }
  }

  fn fail(&self, err: E) {
    {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      state.terminated = true;
    }
    self.left.cancel();
    self.right.cancel();
    self.outlet.complete(Completion::Failed(err));
  }
}

impl<L, R, E, S> Subscription for CombineNode<L, R, E, S>
where
  L: Clone + Send + 'static,
  R: Clone + Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn request(&self, demand: Demand) { self.outlet.request(demand); }

  fn cancel(&self) {
    self.outlet.cancel();
    self.left.cancel();
    self.right.cancel();
  }
}

struct CombineLeft<L, R, E, S>(Arc<CombineNode<L, R, E, S>>);

impl<L, R, E, S> Subscriber<L, E> for CombineLeft<L, R, E, S>
where
  L: Clone + Send + 'static,
  R: Clone + Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.left.set(subscription) }

  fn receive(&mut self, input: L) -> Demand {
    let latest = {
      let mut state = self.0.state.lock();
      if state.terminated {
        return Demand::NONE;
      }
      state.left = Some(input);
      state.latest()
    };
    if let Some(latest) = latest {
      self.0.outlet.push(latest);
    }
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.left.release();
    match completion {
      Completion::Finished => {
        self.0.state.lock().left_done = true;
        self.0.finish_if_done();
      }
      Completion::Failed(err) => self.0.fail(err),
    }
  }
}

struct CombineRight<L, R, E, S>(Arc<CombineNode<L, R, E, S>>);

impl<L, R, E, S> Subscriber<R, E> for CombineRight<L, R, E, S>
where
  L: Clone + Send + 'static,
  R: Clone + Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.right.set(subscription) }

  fn receive(&mut self, input: R) -> Demand {
    let latest = {
      let mut state = self.0.state.lock();
      if state.terminated {
        return Demand::NONE;
      }
      state.right = Some(input);
      state.latest()
    };
    if let Some(latest) = latest {
      self.0.outlet.push(latest);
    }
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.right.release();
    match completion {
      Completion::Finished => {
        self.0.state.lock().right_done = true;
        self.0.finish_if_done();
      }
      Completion::Failed(err) => self.0.fail(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn emits_once_every_input_has_a_value() {
    let a = PublishSubject::<i32>::new();
    let b = PublishSubject::<i32>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().combine_latest(b.clone()).subscribe(subscriber);
    a.send(1);
    assert_eq!(recorder.value_count(), 0);
    b.send(10);
    assert_eq!(recorder.values(), vec![(1, 10)]);
    a.send(2);
    assert_eq!(recorder.values(), vec![(1, 10), (2, 10)]);
  }

  #[test]
  fn finishes_after_all_inputs() {
    let a = PublishSubject::<i32>::new();
    let b = PublishSubject::<i32>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().combine_latest(b.clone()).subscribe(subscriber);
    a.send(1);
    b.send(2);
    a.send_completion(Completion::Finished);
    b.send(3);
    assert!(!recorder.is_completed());
    b.send_completion(Completion::Finished);
    assert_eq!(recorder.values(), vec![(1, 2), (1, 3)]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn failure_wins_and_cancels() {
    let a = PublishSubject::<i32, &str>::new();
    let b = PublishSubject::<i32, &str>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().combine_latest(b.clone()).subscribe(subscriber);
    a.send_completion(Completion::Finished);
    b.send_completion(Completion::Failed("boom"));
    assert_eq!(recorder.failure(), Some("boom"));

    let a = PublishSubject::<i32, &str>::new();
    let b = PublishSubject::<i32, &str>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().combine_latest(b.clone()).subscribe(subscriber);
    a.send_completion(Completion::Failed("early"));
    assert_eq!(recorder.failure(), Some("early"));
    assert_eq!(b.subscriber_count(), 0);
  }

  #[test]
  fn combinations_wait_for_demand() {
    let a = PublishSubject::<i32>::new();
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(1));
    a.clone().combine_latest(just('x')).subscribe(subscriber);
    a.send(1);
    a.send(2);
    assert_eq!(recorder.values(), vec![(1, 'x')]);
    recorder.request(Demand::max(1));
    assert_eq!(recorder.values(), vec![(1, 'x'), (2, 'x')]);
  }

  #[test]
  fn three_inputs_flatten() {
    let a = PublishSubject::<i32>::new();
    let b = PublishSubject::<&str>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().combine_latest3(b.clone(), just(true)).subscribe(subscriber);
    a.send(1);
    b.send("one");
    a.send(2);
    assert_eq!(recorder.values(), vec![(1, "one", true), (2, "one", true)]);
  }
}
