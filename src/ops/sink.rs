use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, SubscriptionRef},
};

/// Closure-backed consumer that requests unlimited demand.
pub struct Sink<FV, FC> {
  on_value: FV,
  on_completion: Option<FC>,
  handle: Cancellable,
}

impl<FV, FC> Sink<FV, FC> {
  pub(crate) fn new(on_value: FV, on_completion: FC) -> (Self, Cancellable) {
    let handle = Cancellable::new();
    (Self { on_value, on_completion: Some(on_completion), handle: handle.clone() }, handle)
  }
}

impl<T, E, FV, FC> Subscriber<T, E> for Sink<FV, FC>
where
  FV: FnMut(T) + Send + 'static,
  FC: FnOnce(Completion<E>) + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    if self.handle.bind(subscription.clone()) {
      subscription.request(Demand::Unlimited);
    }
  }

  fn receive(&mut self, input: T) -> Demand {
    (self.on_value)(input);
    Demand::NONE
  }

  fn receive_completion(mut self, completion: Completion<E>) {
    self.handle.release();
    if let Some(on_completion) = self.on_completion.take() {
      on_completion(completion);
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[test]
  fn collects_values_and_completion() {
    let log = MutArc::own(vec![]);
    let (values, done) = (log.clone(), log.clone());
    let handle = from_iter(1..=3).sink(
      move |v| values.lock().push(format!("{v}")),
      move |c: Completion<_>| done.lock().push(format!("{c:?}")),
    );
    assert_eq!(*log.lock(), vec!["1", "2", "3", "Finished"]);
    assert!(!handle.is_cancelled());
  }

  #[test]
  fn cancel_stops_delivery() {
    let subject = PublishSubject::<i32>::new();
    let seen = MutArc::own(vec![]);
    let s = seen.clone();
    let handle = subject.clone().sink_value(move |v| s.lock().push(v));
    subject.send(1);
    handle.cancel();
    subject.send(2);
    assert_eq!(*seen.lock(), vec![1]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn guard_cancels_on_drop() {
    let subject = PublishSubject::<i32>::new();
    {
      let _guard = subject.clone().sink_value(|_| {}).cancel_when_dropped();
      assert_eq!(subject.subscriber_count(), 1);
    }
    assert_eq!(subject.subscriber_count(), 0);
  }
}
