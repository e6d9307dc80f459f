use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Drops the first `count` values.
#[derive(Clone)]
pub struct Skip<P> {
  pub(crate) source: P,
  pub(crate) count: usize,
}

impl<P: Publisher> Publisher for Skip<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    self.source.subscribe(SkipSubscriber { downstream: subscriber, remaining: self.count })
  }
}

pub struct SkipSubscriber<S> {
  downstream: S,
  remaining: usize,
}

impl<S, T, E> Subscriber<T, E> for SkipSubscriber<S>
where
  S: Subscriber<T, E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand {
    if self.remaining > 0 {
      self.remaining -= 1;
      Demand::max(1)
    } else {
      self.downstream.receive(input)
    }
  }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}
