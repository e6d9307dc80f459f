use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

/// Drops values equal to the previous one.
#[derive(Clone)]
pub struct DistinctUntilChanged<P> {
  pub(crate) source: P,
}

impl<P> Publisher for DistinctUntilChanged<P>
where
  P: Publisher,
  P::Output: PartialEq + Clone,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    self.source.subscribe(DistinctUntilChangedSubscriber { downstream: subscriber, last: None })
  }
}

pub struct DistinctUntilChangedSubscriber<S, T> {
  downstream: S,
  last: Option<T>,
}

impl<S, T, E> Subscriber<T, E> for DistinctUntilChangedSubscriber<S, T>
where
  S: Subscriber<T, E>,
  T: PartialEq + Clone + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, input: T) -> Demand {
    if self.last.as_ref() == Some(&input) {
      return Demand::max(1);
    }
    self.last = Some(input.clone());
    self.downstream.receive(input)
  }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn collapses_runs() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter([1, 1, 2, 2, 2, 1, 3, 3]).distinct_until_changed().subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2, 1, 3]);
  }
}
