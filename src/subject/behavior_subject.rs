use std::{convert::Infallible, sync::Arc};

use super::hub::{Hub, Latest};
use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// A [`PublishSubject`](super::PublishSubject) that remembers the latest
/// value.
///
/// A new subscriber first receives the value that is current when its first
/// demand arrives, then everything sent afterwards.
pub struct BehaviorSubject<T, E = Infallible> {
  hub: Arc<Hub<T, E, Latest<T>>>,
}

impl<T, E> Clone for BehaviorSubject<T, E> {
  fn clone(&self) -> Self { Self { hub: self.hub.clone() } }
}

impl<T, E> BehaviorSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new(initial: T) -> Self { Self { hub: Arc::new(Hub::new(Latest(initial))) } }

  pub fn send(&self, value: T) { self.hub.send(value) }

  pub fn send_completion(&self, completion: Completion<E>) { self.hub.send_completion(completion) }

  pub fn subscriber_count(&self) -> usize { self.hub.subscriber_count() }

  /// The latest value.
  pub fn value(&self) -> T {
    match self.hub.recall() {
      Some(value) => value,
      None => unreachable!("a behavior subject always holds a value"),
    }
  }
}

impl<T, E> Publisher for BehaviorSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<T, E>,
  {
    self.hub.attach(subscriber)
  }
}

impl<T, E> Subscriber<T, E> for BehaviorSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.hub.add_source(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    self.send(input);
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) { self.send_completion(completion) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestSubscriber;

  #[test]
  fn late_subscriber_starts_with_the_latest_value() {
    let subject = BehaviorSubject::<i32>::new(0);
    subject.send(1);
    subject.send(2);
    let (subscriber, recorder) = TestSubscriber::unlimited();
    subject.clone().subscribe(subscriber);
    subject.send(3);
    assert_eq!(recorder.values(), vec![2, 3]);
    assert_eq!(subject.value(), 3);
  }

  #[test]
  fn value_is_taken_when_demand_arrives() {
    let subject = BehaviorSubject::<&str>::new("a");
    let (subscriber, recorder) = TestSubscriber::new(Demand::NONE);
    subject.clone().subscribe(subscriber);
    subject.send("b");
    assert_eq!(recorder.value_count(), 0);

    recorder.request(Demand::max(2));
    subject.send("c");
    subject.send("d");
    assert_eq!(recorder.values(), vec!["b", "c"]);
  }

  #[test]
  fn completed_subject_replays_only_the_completion() {
    let subject = BehaviorSubject::<i32>::new(5);
    subject.send_completion(Completion::Finished);
    subject.send(6);
    let (subscriber, recorder) = TestSubscriber::unlimited();
    subject.clone().subscribe(subscriber);
    assert_eq!(recorder.value_count(), 0);
    assert!(recorder.is_finished());
    assert_eq!(subject.value(), 5);
  }
}
