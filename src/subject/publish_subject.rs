use std::{convert::Infallible, sync::Arc};

use super::hub::{Forget, Hub};
use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Broadcasts every sent value to the subscribers attached at that moment.
///
/// A subscriber without outstanding demand misses the value; nothing is
/// buffered. After a completion has been sent, further sends are ignored and
/// late subscribers receive that completion right away.
///
/// Clones are handles to the same subject.
pub struct PublishSubject<T, E = Infallible> {
  hub: Arc<Hub<T, E, Forget>>,
}

impl<T, E> Clone for PublishSubject<T, E> {
  fn clone(&self) -> Self { Self { hub: self.hub.clone() } }
}

impl<T, E> PublishSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new() -> Self { Self { hub: Arc::new(Hub::new(Forget)) } }

  pub fn send(&self, value: T) { self.hub.send(value) }

  pub fn send_completion(&self, completion: Completion<E>) { self.hub.send_completion(completion) }

  pub fn subscriber_count(&self) -> usize { self.hub.subscriber_count() }
}

impl<T, E> Default for PublishSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<T, E> Publisher for PublishSubject<T, E>
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

/// Subscribing a subject to a publisher multicasts that publisher.
impl<T, E> Subscriber<T, E> for PublishSubject<T, E>
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
  use crate::{
    prelude::*,
    testing::{Event, TestSubscriber},
  };

  #[test]
  fn broadcasts_to_every_subscriber() {
    let subject = PublishSubject::<i32>::new();
    let (first, a) = TestSubscriber::unlimited();
    let (second, b) = TestSubscriber::unlimited();
    subject.clone().subscribe(first);
    subject.send(1);
    subject.clone().subscribe(second);
    subject.send(2);
    assert_eq!(a.values(), vec![1, 2]);
    assert_eq!(b.values(), vec![2]);
    assert_eq!(subject.subscriber_count(), 2);
  }

  #[test]
  fn subscriber_without_demand_misses_values() {
    let subject = PublishSubject::<i32>::new();
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(1));
    subject.clone().subscribe(subscriber);
    subject.send(1);
    subject.send(2);
    recorder.request(Demand::max(1));
    subject.send(3);
    assert_eq!(recorder.values(), vec![1, 3]);
  }

  #[test]
  fn completion_is_final_and_replayed_to_late_subscribers() {
    let subject = PublishSubject::<i32, String>::new();
    let (early, a) = TestSubscriber::unlimited();
    subject.clone().subscribe(early);
    subject.send_completion(Completion::Failed("closed".into()));
    subject.send(1);
    assert_eq!(a.failure(), Some("closed".to_string()));
    assert_eq!(subject.subscriber_count(), 0);

    let (late, b) = TestSubscriber::unlimited();
    subject.clone().subscribe(late);
    assert_eq!(b.events(), vec![Event::Subscribed, Event::Completion(Completion::Failed("closed".to_string()))]);
  }

  #[test]
  fn reentrant_send_is_delivered_after_the_current_one() {
    let subject = PublishSubject::<i32>::new();
    let seen = MutArc::own(vec![]);
    let (inner, log) = (subject.clone(), seen.clone());
    let _echo = subject
      .clone()
      .sink_value(move |v| {
        log.lock().push(v);
        if v < 3 {
          inner.send(v + 1);
        }
      })
      .cancel_when_dropped();
    subject.send(1);
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
  }

  #[test]
  fn multicasts_an_upstream() {
    let subject = PublishSubject::<i32>::new();
    let (first, a) = TestSubscriber::unlimited();
    let (second, b) = TestSubscriber::unlimited();
    subject.clone().subscribe(first);
    subject.clone().subscribe(second);
    from_iter(1..=3).subscribe(subject.clone());
    assert_eq!(a.values(), vec![1, 2, 3]);
    assert_eq!(b.values(), vec![1, 2, 3]);
    assert!(a.is_finished() && b.is_finished());
  }

  #[test]
  fn concurrent_senders() {
    let subject = PublishSubject::<usize>::new();
    let count = MutArc::own(0usize);
    let c = count.clone();
    let _guard = subject.clone().sink_value(move |_| *c.lock() += 1).cancel_when_dropped();
    let threads: Vec<_> = (0..4)
      .map(|_| {
        let subject = subject.clone();
        std::thread::spawn(move || (0..250).for_each(|v| subject.send(v)))
      })
      .collect();
    threads.into_iter().for_each(|t| t.join().unwrap());
    assert_eq!(*count.lock(), 1000);
  }
}
