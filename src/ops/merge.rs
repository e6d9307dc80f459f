//! Merge: values of all inputs interleaved in arrival order.
//!
//! Downstream demand is shared out among the inputs round-robin: every unit
//! the downstream grants is requested from exactly one input, and an input
//! that finishes hands its unused share to the others. Finishes once every
//! input has finished, fails as soon as one input fails, cancelling the rest.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{DemandPool, Subscription, SubscriptionRef, Upstream},
};

#[derive(Clone)]
pub struct Merge<A, B> {
  pub(crate) a: A,
  pub(crate) b: B,
}

impl<A, B> Publisher for Merge<A, B>
where
  A: Publisher,
  B: Publisher<Output = A::Output, Failure = A::Failure>,
{
  type Output = A::Output;
  type Failure = A::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<A::Output, A::Failure>,
  {
    let node = MergeNode::start(subscriber, 2);
    self.a.subscribe(MergeInput { node: node.clone(), index: 0 });
    self.b.subscribe(MergeInput { node, index: 1 });
  }
}

/// Merge over any number of publishers of the same type.
#[derive(Clone)]
pub struct MergeAll<P> {
  sources: Vec<P>,
}

pub fn merge_all<P: Publisher>(sources: impl IntoIterator<Item = P>) -> MergeAll<P> {
  MergeAll { sources: sources.into_iter().collect() }
}

impl<P: Publisher> Publisher for MergeAll<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    let node = MergeNode::start(subscriber, self.sources.len());
    if self.sources.is_empty() {
      node.outlet.complete(Completion::Finished);
      return;
    }
    for (index, source) in self.sources.into_iter().enumerate() {
      source.subscribe(MergeInput { node: node.clone(), index });
    }
  }
}

struct MergeNode<T, E, S> {
  outlet: Outlet<T, E, S>,
  inputs: Vec<Upstream>,
  state: Mutex<MergeState>,
}

struct MergeState {
  // Lanes are keyed by input index.
  demand: DemandPool<usize>,
  active: usize,
  terminated: bool,
}

impl<T, E, S> MergeNode<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn start(subscriber: S, inputs: usize) -> Arc<Self> {
    let mut demand = DemandPool::new();
    for index in 0..inputs {
      demand.add(index);
    }
    let node = Arc::new(MergeNode {
      outlet: Outlet::new(subscriber),
      inputs: (0..inputs).map(|_| Upstream::new()).collect(),
      state: Mutex::new(MergeState { demand, active: inputs, terminated: false }),
    });
    node.outlet.attach(node.clone());
    node
  }

  /// Add `demand` to the budget and request the shares it yields. The share
  /// of input `own` is returned instead of requested.
  fn grant(&self, demand: Demand, own: Option<usize>) -> Demand {
    let grants = {
      let mut state = self.state.lock();
      state.demand.deposit(demand);
      state.demand.distribute()
    };
    let mut kept = Demand::NONE;
    for (_, index, share) in grants {
      if Some(index) == own {
        kept += share;
      } else if let Some(input) = self.inputs.get(index) {
        input.request(share);
      }
    }
    kept
  }

  fn cancel_inputs(&self) {
    for input in &self.inputs {
      input.cancel();
    }
  }
}

impl<T, E, S> Subscription for MergeNode<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn request(&self, demand: Demand) {
    let extra = self.outlet.request(demand);
    self.grant(demand + extra, None);
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.cancel_inputs();
  }
}

struct MergeInput<T, E, S> {
  node: Arc<MergeNode<T, E, S>>,
  index: usize,
}

impl<T, E, S> Subscriber<T, E> for MergeInput<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    if let Some(input) = self.node.inputs.get(self.index) {
      input.set(subscription);
    }
  }

  fn receive(&mut self, input: T) -> Demand {
    self.node.state.lock().demand.delivered(self.index);
    let extra = self.node.outlet.push(input);
    self.node.grant(extra, Some(self.index))
  }

  fn receive_completion(self, completion: Completion<E>) {
    if let Some(input) = self.node.inputs.get(self.index) {
      input.release();
    }
    match completion {
      Completion::Finished => {
        let done = {
          let mut state = self.node.state.lock();
          state.demand.remove(self.index);
          state.active = state.active.saturating_sub(1);
          let done = state.active == 0 && !state.terminated;
          state.terminated |= done;
          done
        };
        // Its unused share goes to the inputs still running.
        self.node.grant(Demand::NONE, None);
        if done {
          self.node.outlet.complete(Completion::Finished);
        }
      }
      Completion::Failed(err) => {
        self.node.state.lock().terminated = true;
        self.node.cancel_inputs();
        self.node.outlet.complete(Completion::Failed(err));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn interleaves_in_arrival_order() {
    let a = PublishSubject::<i32>::new();
    let b = PublishSubject::<i32>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().merge(b.clone()).subscribe(subscriber);
    a.send(1);
    b.send(2);
    a.send(3);
    b.send(4);
    a.send_completion(Completion::Finished);
    assert!(!recorder.is_completed());
    b.send_completion(Completion::Finished);
    assert_eq!(recorder.values(), vec![1, 2, 3, 4]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn failure_cancels_the_rest() {
    let a = PublishSubject::<i32, &str>::new();
    let b = PublishSubject::<i32, &str>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    a.clone().merge(b.clone()).subscribe(subscriber);
    a.send(1);
    a.send_completion(Completion::Failed("a failed"));
    b.send(2);
    assert_eq!(recorder.values(), vec![1]);
    assert_eq!(recorder.failure(), Some("a failed"));
    assert_eq!(b.subscriber_count(), 0);
  }

  #[test]
  fn never_exceeds_downstream_demand() {
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(3));
    from_iter(0..5).merge(from_iter(10..15)).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![0, 1, 10]);
    recorder.request(Demand::max(4));
    assert_eq!(recorder.values(), vec![0, 1, 10, 2, 3, 11, 12]);
    recorder.request(Demand::Unlimited);
    assert_eq!(recorder.value_count(), 10);
    assert!(recorder.is_finished());
  }

  #[test]
  fn inputs_produce_only_what_downstream_asked_for() {
    let produced = MutArc::own(0usize);
    let (a, b) = (produced.clone(), produced.clone());
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(1));
    from_iter(0..)
      .map(move |x| {
        *a.lock() += 1;
        x
      })
      .merge(from_iter(1_000_000..).map(move |x| {
        *b.lock() += 1;
        x
      }))
      .subscribe(subscriber);

    for _ in 0..999 {
      recorder.request(Demand::max(1));
    }
    assert_eq!(recorder.value_count(), 1000);
    assert_eq!(*produced.lock(), 1000);
    assert_eq!(recorder.values()[..4], [0, 1_000_000, 1, 1_000_001]);
  }

  #[test]
  fn finished_input_passes_on_its_share() {
    let a = PublishSubject::<i32>::new();
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(2));
    a.clone().merge(from_iter(10..13)).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![10]);

    a.send_completion(Completion::Finished);
    assert_eq!(recorder.values(), vec![10, 11]);
    recorder.request(Demand::Unlimited);
    assert_eq!(recorder.values(), vec![10, 11, 12]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn merge_all_of_many() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    merge_all((0..4).map(|i| just(i * 10))).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![0, 10, 20, 30]);
    assert!(recorder.is_finished());

    let (subscriber, recorder) = TestSubscriber::<i32, Infallible>::unlimited();
    merge_all(Vec::<Just<i32>>::new()).subscribe(subscriber);
    assert!(recorder.is_finished());
  }
}
