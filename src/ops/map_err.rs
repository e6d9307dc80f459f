use std::{convert::Infallible, marker::PhantomData};

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

// ==================== MapErr ====================

/// Converts the failure value; values and `Finished` pass untouched.
#[derive(Clone)]
pub struct MapErr<P, F> {
  pub(crate) source: P,
  pub(crate) func: F,
}

impl<P, F, E> Publisher for MapErr<P, F>
where
  P: Publisher,
  F: FnOnce(P::Failure) -> E + Send + 'static,
  E: Send + 'static,
{
  type Output = P::Output;
  type Failure = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, E>,
  {
    self.source.subscribe(MapErrSubscriber { downstream: subscriber, func: self.func })
  }
}

pub struct MapErrSubscriber<S, F> {
  downstream: S,
  func: F,
}

impl<S, F, T, E, E2> Subscriber<T, E> for MapErrSubscriber<S, F>
where
  S: Subscriber<T, E2>,
  F: FnOnce(E) -> E2 + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand { self.downstream.receive(input) }

  fn receive_completion(self, completion: Completion<E>) {
    self.downstream.receive_completion(completion.map_err(self.func))
  }
}

// ==================== SetFailureType ====================

/// Gives a chain that cannot fail the failure type `E`, so it can be combined
/// with fallible chains.
pub struct SetFailureType<P, E> {
  pub(crate) source: P,
  pub(crate) _failure: PhantomData<fn() -> E>,
}

impl<P: Clone, E> Clone for SetFailureType<P, E> {
  fn clone(&self) -> Self { Self { source: self.source.clone(), _failure: PhantomData } }
}

impl<P, E> Publisher for SetFailureType<P, E>
where
  P: Publisher<Failure = Infallible>,
  E: Send + 'static,
{
  type Output = P::Output;
  type Failure = E;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, E>,
  {
    self.source.subscribe(SetFailureTypeSubscriber { downstream: subscriber, _failure: PhantomData })
  }
}

pub struct SetFailureTypeSubscriber<S, E> {
  downstream: S,
  _failure: PhantomData<fn() -> E>,
}

impl<S, T, E> Subscriber<T, Infallible> for SetFailureTypeSubscriber<S, E>
where
  S: Subscriber<T, E>,
  E: 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand { self.downstream.receive(input) }

  fn receive_completion(self, completion: Completion<Infallible>) {
    match completion {
      Completion::Finished => self.downstream.receive_completion(Completion::Finished),
      Completion::Failed(never) => match never {},
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  #[derive(Debug, Clone, PartialEq)]
  enum AppError {
    Io(String),
  }

  #[test]
  fn converts_the_failure() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    Record::failing([1, 2], "disk full").map_err(|e| AppError::Io(e.to_string())).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(recorder.failure(), Some(AppError::Io("disk full".into())));
  }

  #[test]
  fn infallible_chain_joins_a_fallible_one() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter(0..2)
      .set_failure_type::<&str>()
      .merge(Record::failing([9], "later"))
      .subscribe(subscriber);
    assert_eq!(recorder.values(), vec![0, 1, 9]);
    assert_eq!(recorder.failure(), Some("later"));
  }
}
