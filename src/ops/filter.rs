use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Forwards only the values `predicate` accepts.
///
/// Every rejected value used up one unit of the upstream demand, so it is
/// re-requested right away: the downstream's outstanding demand stays intact.
#[derive(Clone)]
pub struct Filter<P, F> {
  pub(crate) source: P,
  pub(crate) predicate: F,
}

impl<P, F> Publisher for Filter<P, F>
where
  P: Publisher,
  F: FnMut(&P::Output) -> bool + Send + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    self.source.subscribe(FilterSubscriber { downstream: subscriber, predicate: self.predicate })
  }
}

pub struct FilterSubscriber<S, F> {
  downstream: S,
  predicate: F,
}

impl<S, F, T, E> Subscriber<T, E> for FilterSubscriber<S, F>
where
  S: Subscriber<T, E>,
  F: FnMut(&T) -> bool + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand {
    if (self.predicate)(&input) {
      self.downstream.receive(input)
    } else {
      Demand::max(1)
    }
  }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}
