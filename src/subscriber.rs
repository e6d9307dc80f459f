//! Subscriber trait and its type-erased form.
//!
//! A subscriber sees, in order: one subscription, zero or more values (never
//! more than the demand it granted), and at most one [`Completion`].

use crate::{demand::Demand, subscription::SubscriptionRef};

/// Terminal event of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completion<E> {
  Finished,
  Failed(E),
}

impl<E> Completion<E> {
  #[inline]
  pub fn is_failure(&self) -> bool { matches!(self, Completion::Failed(_)) }

  /// Convert the failure value, keeping `Finished` as is.
  pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Completion<F> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(err) => Completion::Failed(f(err)),
    }
  }

  pub fn as_ref(&self) -> Completion<&E> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(err) => Completion::Failed(err),
    }
  }
}

impl<E> From<Result<(), E>> for Completion<E> {
  fn from(result: Result<(), E>) -> Self {
    match result {
      Ok(()) => Completion::Finished,
      Err(err) => Completion::Failed(err),
    }
  }
}

/// Consumer side of the protocol.
///
/// `receive_completion` consumes the subscriber: once a terminal event is
/// delivered nothing else can be.
pub trait Subscriber<Input, Failure>: Send + 'static {
  /// Called once, before anything else. The subscriber keeps the handle to
  /// grant demand and to cancel.
  fn receive_subscription(&mut self, subscription: SubscriptionRef);

  /// Called for each value. The return value is *additional* demand granted
  /// on top of what is still outstanding.
  fn receive(&mut self, input: Input) -> Demand;

  fn receive_completion(self, completion: Completion<Failure>);
}

/// Object-safe mirror of [`Subscriber`], used only to box subscribers at API
/// boundaries.
pub trait DynSubscriber<Input, Failure>: Send + 'static {
  fn box_receive_subscription(&mut self, subscription: SubscriptionRef);
  fn box_receive(&mut self, input: Input) -> Demand;
  fn box_receive_completion(self: Box<Self>, completion: Completion<Failure>);
}

impl<S, Input, Failure> DynSubscriber<Input, Failure> for S
where
  S: Subscriber<Input, Failure>,
{
  #[inline]
  fn box_receive_subscription(&mut self, subscription: SubscriptionRef) {
    self.receive_subscription(subscription)
  }

  #[inline]
  fn box_receive(&mut self, input: Input) -> Demand { self.receive(input) }

  #[inline]
  fn box_receive_completion(self: Box<Self>, completion: Completion<Failure>) {
    (*self).receive_completion(completion)
  }
}

pub type BoxedSubscriber<Input, Failure> = Box<dyn DynSubscriber<Input, Failure>>;

impl<Input: 'static, Failure: 'static> Subscriber<Input, Failure>
  for BoxedSubscriber<Input, Failure>
{
  #[inline]
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    (**self).box_receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, input: Input) -> Demand { (**self).box_receive(input) }

  #[inline]
  fn receive_completion(self, completion: Completion<Failure>) {
    self.box_receive_completion(completion)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{rc::MutArc, subscription::EmptySubscription};

  struct Collect(MutArc<Vec<i32>>, MutArc<Option<Completion<()>>>);

  impl Subscriber<i32, ()> for Collect {
    fn receive_subscription(&mut self, subscription: SubscriptionRef) {
      subscription.request(Demand::Unlimited);
    }

    fn receive(&mut self, input: i32) -> Demand {
      self.0.lock().push(input);
      Demand::NONE
    }

    fn receive_completion(self, completion: Completion<()>) { *self.1.lock() = Some(completion); }
  }

  #[test]
  fn boxed_subscriber_forwards_everything() {
    let values = MutArc::own(vec![]);
    let done = MutArc::own(None);
    let mut boxed: BoxedSubscriber<i32, ()> = Box::new(Collect(values.clone(), done.clone()));
    boxed.receive_subscription(EmptySubscription::shared());
    boxed.receive(1);
    boxed.receive(2);
    boxed.receive_completion(Completion::Failed(()));
    assert_eq!(*values.lock(), vec![1, 2]);
    assert_eq!(*done.lock(), Some(Completion::Failed(())));
  }

  #[test]
  fn completion_helpers() {
    let failed: Completion<&str> = Err("boom").into();
    assert!(failed.is_failure());
    assert_eq!(failed.map_err(str::len), Completion::Failed(4));
    assert_eq!(Completion::<()>::from(Ok(())), Completion::Finished);
  }
}
