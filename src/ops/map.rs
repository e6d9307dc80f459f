use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Transforms every value with `func`. Demand passes through 1:1.
#[derive(Clone)]
pub struct Map<P, F> {
  pub(crate) source: P,
  pub(crate) func: F,
}

impl<P, F, B> Publisher for Map<P, F>
where
  P: Publisher,
  F: FnMut(P::Output) -> B + Send + 'static,
  B: Send + 'static,
{
  type Output = B;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Failure>,
  {
    self.source.subscribe(MapSubscriber { downstream: subscriber, func: self.func })
  }
}

pub struct MapSubscriber<S, F> {
  downstream: S,
  func: F,
}

impl<S, F, T, B, E> Subscriber<T, E> for MapSubscriber<S, F>
where
  S: Subscriber<B, E>,
  F: FnMut(T) -> B + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand { self.downstream.receive((self.func)(input)) }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn primitive_type() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter(100..103).map(|v| v * 2).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![200, 202, 204]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn changes_the_output_type() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    just(3).map(|v| "x".repeat(v)).subscribe(subscriber);
    assert_eq!(recorder.values(), vec!["xxx".to_string()]);
  }

  #[test]
  fn demand_passes_through() {
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(2));
    from_iter(0..10).map(|v| v + 1).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2]);
    recorder.request(Demand::max(1));
    assert_eq!(recorder.values(), vec![1, 2, 3]);
  }

  #[test]
  fn failure_passes_through() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    Record::failing([1], "bad").map(|v| v * 10).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![10]);
    assert_eq!(recorder.failure(), Some("bad"));
  }
}
