use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Emits the first `count` values, then cancels the upstream and finishes.
#[derive(Clone)]
pub struct Take<P> {
  pub(crate) source: P,
  pub(crate) count: usize,
}

impl<P: Publisher> Publisher for Take<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    self.source.subscribe(TakeSubscriber {
      downstream: Some(subscriber),
      remaining: self.count,
      subscription: None,
    })
  }
}

pub struct TakeSubscriber<S> {
  downstream: Option<S>,
  remaining: usize,
  subscription: Option<SubscriptionRef>,
}

impl<S> TakeSubscriber<S> {
  fn finish<T, E>(&mut self)
  where
    S: Subscriber<T, E>,
  {
    if let Some(subscription) = self.subscription.take() {
      subscription.cancel();
    }
    if let Some(downstream) = self.downstream.take() {
      downstream.receive_completion(Completion::Finished);
    }
  }
}

impl<S, T, E> Subscriber<T, E> for TakeSubscriber<S>
where
  S: Subscriber<T, E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.subscription = Some(subscription.clone());
    if let Some(downstream) = self.downstream.as_mut() {
      downstream.receive_subscription(subscription);
    }
    if self.remaining == 0 {
      self.finish::<T, E>();
    }
  }

  fn receive(&mut self, input: T) -> Demand {
    if self.remaining == 0 {
      return Demand::NONE;
    }
    self.remaining -= 1;
    let demand = match self.downstream.as_mut() {
      Some(downstream) => downstream.receive(input),
      None => Demand::NONE,
    };
    if self.remaining == 0 {
      self.finish::<T, E>();
      return Demand::NONE;
    }
    demand
  }

  fn receive_completion(mut self, completion: Completion<E>) {
    if let Some(downstream) = self.downstream.take() {
      downstream.receive_completion(completion);
    }
  }
}
