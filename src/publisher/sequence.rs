//! Synchronous, demand-respecting sources backed by an iterator.
//!
//! Every finite source in the crate (`just`, `from_iter`, `empty`, `fail`,
//! [`Record`]) is a [`Sequence`]: an iterator plus the completion to deliver
//! once it is exhausted. Values are pulled only when the subscriber has
//! demand; the completion needs no demand.

use std::{
  convert::Infallible,
  iter::{self, Once},
  marker::PhantomData,
  sync::Arc,
  vec,
};

use parking_lot::Mutex;

use super::Publisher;
use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::Subscription,
};

/// Emits the items of an iterator, then `end`.
#[derive(Clone)]
pub struct Sequence<I, E> {
  iter: I,
  end: Completion<E>,
}

pub type Just<T> = Sequence<Once<T>, Infallible>;
pub type Empty<T, E> = Sequence<iter::Empty<T>, E>;
pub type Fail<T, E> = Sequence<iter::Empty<T>, E>;

/// A single value, then finished.
pub fn just<T>(value: T) -> Just<T> { Sequence { iter: iter::once(value), end: Completion::Finished } }

/// Every item of `iter`, then finished.
pub fn from_iter<I: IntoIterator>(iter: I) -> Sequence<I::IntoIter, Infallible> {
  Sequence { iter: iter.into_iter(), end: Completion::Finished }
}

/// Finishes immediately without emitting.
pub fn empty<T, E>() -> Empty<T, E> { Sequence { iter: iter::empty(), end: Completion::Finished } }

/// Fails immediately with `err`.
pub fn fail<T, E>(err: E) -> Fail<T, E> {
  Sequence { iter: iter::empty(), end: Completion::Failed(err) }
}

/// A prerecorded stream: fixed values followed by a fixed completion, which
/// may be a failure.
pub struct Record<T, E>(PhantomData<(T, E)>);

impl<T, E> Record<T, E> {
  #[allow(clippy::new_ret_no_self)]
  pub fn new(values: impl IntoIterator<Item = T>, end: Completion<E>) -> Sequence<vec::IntoIter<T>, E> {
    Sequence { iter: values.into_iter().collect::<Vec<_>>().into_iter(), end }
  }

  pub fn failing(values: impl IntoIterator<Item = T>, err: E) -> Sequence<vec::IntoIter<T>, E> {
    Self::new(values, Completion::Failed(err))
  }
}

impl<I, E> Publisher for Sequence<I, E>
where
  I: Iterator + Send + 'static,
  I::Item: Send + 'static,
  E: Send + 'static,
{
  type Output = I::Item;
  type Failure = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<I::Item, E>,
  {
    let node = Arc::new(SequenceNode {
      state: Mutex::new(SequenceState {
        iter: self.iter,
        peeked: None,
        end: Some(self.end),
        demand: Demand::NONE,
        // The subscribing thread owns the drain until the subscription has
        // been delivered.
        draining: true,
        cancelled: false,
        done: false,
      }),
      downstream: Mutex::new(Some(subscriber)),
    });
    if let Some(downstream) = node.downstream.lock().as_mut() {
      downstream.receive_subscription(node.clone());
    }
    node.drain();
  }
}

struct SequenceNode<I: Iterator, E, S> {
  state: Mutex<SequenceState<I, E>>,
  downstream: Mutex<Option<S>>,
}

struct SequenceState<I: Iterator, E> {
  iter: I,
  peeked: Option<I::Item>,
  end: Option<Completion<E>>,
  demand: Demand,
  draining: bool,
  cancelled: bool,
  done: bool,
}

enum Step<T, E> {
  Value(T),
  Complete(Completion<E>),
  Release,
  Idle,
}

impl<I: Iterator, E> SequenceState<I, E> {
  fn next_step(&mut self) -> Step<I::Item, E> {
    if self.cancelled {
      return Step::Release;
    }
    if self.done {
      self.draining = false;
      return Step::Idle;
    }
    if self.peeked.is_none() {
      self.peeked = self.iter.next();
    }
    match self.peeked.take() {
      None => {
        self.done = true;
        match self.end.take() {
          Some(end) => Step::Complete(end),
          None => Step::Idle,
        }
      }
      Some(value) if self.demand.take_one() => Step::Value(value),
      Some(value) => {
        self.peeked = Some(value);
        self.draining = false;
        Step::Idle
      }
    }
  }
}

impl<I, E, S> SequenceNode<I, E, S>
where
  I: Iterator,
  S: Subscriber<I::Item, E>,
{
  /// Deliver as much as demand allows. Only the holder of the drain token
  /// calls this.
  fn drain(&self) {
    loop {
      let step = self.state.lock().next_step();
      match step {
        Step::Value(value) => {
          let more = match self.downstream.lock().as_mut() {
            Some(downstream) => downstream.receive(value),
            None => Demand::NONE,
          };
          if !more.is_none() {
            self.state.lock().demand += more;
          }
        }
        Step::Complete(end) => {
          let downstream = self.downstream.lock().take();
          if let Some(downstream) = downstream {
            downstream.receive_completion(end);
          }
          return;
        }
        Step::Release => {
          let downstream = self.downstream.lock().take();
          drop(downstream);
          return;
        }
        Step::Idle => return,
      }
    }
  }
}

impl<I, E, S> Subscription for SequenceNode<I, E, S>
where
  I: Iterator + Send + 'static,
  I::Item: Send + 'static,
  E: Send + 'static,
  S: Subscriber<I::Item, E>,
{
  fn request(&self, demand: Demand) {
    {
      let mut state = self.state.lock();
      if state.cancelled || state.done || demand.is_none() {
        return;
      }
      state.demand += demand;
      if std::mem::replace(&mut state.draining, true) {
        return;
      }
    }
    self.drain();
  }

  fn cancel(&self) {
    let release = {
      let mut state = self.state.lock();
      if state.cancelled {
        return;
      }
      state.cancelled = true;
      state.peeked = None;
      // A cancelled node never drains again, so the token is kept for good.
      !std::mem::replace(&mut state.draining, true)
    };
    if release {
      let downstream = self.downstream.lock().take();
      drop(downstream);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{Event, TestSubscriber};

  #[test]
  fn respects_incremental_demand() {
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(2));
    from_iter(1..=5).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2]);
    assert!(!recorder.is_completed());

    recorder.request(Demand::max(2));
    assert_eq!(recorder.values(), vec![1, 2, 3, 4]);

    recorder.request(Demand::max(1));
    assert_eq!(recorder.values(), vec![1, 2, 3, 4, 5]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn completes_without_extra_demand() {
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(3));
    from_iter([1, 2, 3]).subscribe(subscriber);
    assert!(recorder.is_finished());
  }

  #[test]
  fn zero_demand_delivers_nothing() {
    let (subscriber, recorder) = TestSubscriber::<i32, Infallible>::new(Demand::NONE);
    just(1).subscribe(subscriber);
    assert_eq!(recorder.events(), vec![Event::Subscribed]);
  }

  #[test]
  fn empty_and_fail_need_no_demand() {
    let (subscriber, recorder) = TestSubscriber::<i32, &str>::new(Demand::NONE);
    empty().subscribe(subscriber);
    assert!(recorder.is_finished());

    let (subscriber, recorder) = TestSubscriber::<i32, &str>::new(Demand::NONE);
    fail("nope").subscribe(subscriber);
    assert_eq!(recorder.failure(), Some("nope"));
  }

  #[test]
  fn record_ends_with_its_completion() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    Record::failing([1, 2], "bad").subscribe(subscriber);
    assert_eq!(
      recorder.events(),
      vec![
        Event::Subscribed,
        Event::Value(1),
        Event::Value(2),
        Event::Completion(Completion::Failed("bad"))
      ]
    );
  }

  #[test]
  fn per_value_demand_keeps_flowing() {
    let (subscriber, recorder) = TestSubscriber::with_demand(Demand::max(1), Demand::max(1));
    from_iter(0..10).subscribe(subscriber);
    assert_eq!(recorder.value_count(), 10);
    assert!(recorder.is_finished());
  }

  #[test]
  fn cancel_stops_delivery() {
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(1));
    from_iter(0..10).subscribe(subscriber);
    recorder.cancel();
    recorder.request(Demand::max(5));
    assert_eq!(recorder.values(), vec![0]);
    assert!(!recorder.is_completed());
  }

  struct CancelInside {
    subscription: Option<crate::subscription::SubscriptionRef>,
    seen: crate::rc::MutArc<Vec<i32>>,
  }

  impl Subscriber<i32, Infallible> for CancelInside {
    fn receive_subscription(&mut self, subscription: crate::subscription::SubscriptionRef) {
      self.subscription = Some(subscription.clone());
      subscription.request(Demand::Unlimited);
    }

    fn receive(&mut self, input: i32) -> Demand {
      self.seen.lock().push(input);
      if input == 2 {
        if let Some(subscription) = &self.subscription {
          subscription.cancel();
        }
      }
      Demand::NONE
    }

    fn receive_completion(self, _: Completion<Infallible>) {
      panic!("cancelled stream must not complete");
    }
  }

  #[test]
  fn reentrant_cancel_from_receive() {
    let seen = crate::rc::MutArc::own(vec![]);
    from_iter(0..10).subscribe(CancelInside { subscription: None, seen: seen.clone() });
    assert_eq!(*seen.lock(), vec![0, 1, 2]);
  }
}
