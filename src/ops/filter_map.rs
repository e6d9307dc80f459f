use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Maps and filters in one step: `Some` values are forwarded, `None` is
/// dropped and its demand re-requested.
#[derive(Clone)]
pub struct FilterMap<P, F> {
  pub(crate) source: P,
  pub(crate) func: F,
}

impl<P, F, B> Publisher for FilterMap<P, F>
where
  P: Publisher,
  F: FnMut(P::Output) -> Option<B> + Send + 'static,
  B: Send + 'static,
{
  type Output = B;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Failure>,
  {
    self.source.subscribe(FilterMapSubscriber { downstream: subscriber, func: self.func })
  }
}

pub struct FilterMapSubscriber<S, F> {
  downstream: S,
  func: F,
}

impl<S, F, T, B, E> Subscriber<T, E> for FilterMapSubscriber<S, F>
where
  S: Subscriber<B, E>,
  F: FnMut(T) -> Option<B> + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand {
    match (self.func)(input) {
      Some(value) => self.downstream.receive(value),
      None => Demand::max(1),
    }
  }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}
