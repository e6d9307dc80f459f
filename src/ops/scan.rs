use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Folds every value into an accumulator and emits each intermediate result.
#[derive(Clone)]
pub struct Scan<P, F, B> {
  pub(crate) source: P,
  pub(crate) func: F,
  pub(crate) seed: B,
}

impl<P, F, B> Publisher for Scan<P, F, B>
where
  P: Publisher,
  F: FnMut(B, P::Output) -> B + Send + 'static,
  B: Clone + Send + 'static,
{
  type Output = B;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Failure>,
  {
    self.source.subscribe(ScanSubscriber { downstream: subscriber, func: self.func, acc: Some(self.seed) })
  }
}

pub struct ScanSubscriber<S, F, B> {
  downstream: S,
  func: F,
  acc: Option<B>,
}

impl<S, F, T, B, E> Subscriber<T, E> for ScanSubscriber<S, F, B>
where
  S: Subscriber<B, E>,
  F: FnMut(B, T) -> B + Send + 'static,
  B: Clone + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand {
    match self.acc.take() {
      Some(acc) => {
        let next = (self.func)(acc, input);
        self.acc = Some(next.clone());
        self.downstream.receive(next)
      }
      // Only reachable if `func` panicked on an earlier value.
      None => Demand::NONE,
    }
  }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}
