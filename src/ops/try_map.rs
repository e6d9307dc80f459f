//! Fallible transforms: the closure's `Err` becomes the chain's failure.
//!
//! On the first `Err` the upstream is cancelled and the downstream fails;
//! anything the upstream still delivers afterwards is ignored.

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

// ==================== TryMap ====================

#[derive(Clone)]
pub struct TryMap<P, F> {
  pub(crate) source: P,
  pub(crate) func: F,
}

impl<P, F, B> Publisher for TryMap<P, F>
where
  P: Publisher,
  F: FnMut(P::Output) -> Result<B, P::Failure> + Send + 'static,
  B: Send + 'static,
{
  type Output = B;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Failure>,
  {
    self.source.subscribe(TryMapSubscriber { guard: FailGuard::new(subscriber), func: self.func })
  }
}

pub struct TryMapSubscriber<S, F> {
  guard: FailGuard<S>,
  func: F,
}

impl<S, F, T, B, E> Subscriber<T, E> for TryMapSubscriber<S, F>
where
  S: Subscriber<B, E>,
  F: FnMut(T) -> Result<B, E> + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.guard.subscribe::<B, E>(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    if self.guard.is_failed() {
      return Demand::NONE;
    }
    match (self.func)(input) {
      Ok(value) => self.guard.forward::<B, E>(value),
      Err(err) => self.guard.fail::<B, E>(err),
    }
  }

  fn receive_completion(self, completion: Completion<E>) { self.guard.complete::<B, E>(completion) }
}

// ==================== TryFilter ====================

#[derive(Clone)]
pub struct TryFilter<P, F> {
  pub(crate) source: P,
  pub(crate) predicate: F,
}

impl<P, F> Publisher for TryFilter<P, F>
where
  P: Publisher,
  F: FnMut(&P::Output) -> Result<bool, P::Failure> + Send + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    self.source.subscribe(TryFilterSubscriber { guard: FailGuard::new(subscriber), predicate: self.predicate })
  }
}

pub struct TryFilterSubscriber<S, F> {
  guard: FailGuard<S>,
  predicate: F,
}

impl<S, F, T, E> Subscriber<T, E> for TryFilterSubscriber<S, F>
where
  S: Subscriber<T, E>,
  F: FnMut(&T) -> Result<bool, E> + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.guard.subscribe::<T, E>(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    if self.guard.is_failed() {
      return Demand::NONE;
    }
    match (self.predicate)(&input) {
      Ok(true) => self.guard.forward::<T, E>(input),
      Ok(false) => Demand::max(1),
      Err(err) => self.guard.fail::<T, E>(err),
    }
  }

  fn receive_completion(self, completion: Completion<E>) { self.guard.complete::<T, E>(completion) }
}

// ==================== FailGuard ====================

/// Downstream plus upstream handle, able to fail the chain from the middle.
pub struct FailGuard<S> {
  downstream: Option<S>,
  subscription: Option<SubscriptionRef>,
}

impl<S> FailGuard<S> {
  fn new(downstream: S) -> Self { Self { downstream: Some(downstream), subscription: None } }

  fn is_failed(&self) -> bool { self.downstream.is_none() }

  fn subscribe<T, E>(&mut self, subscription: SubscriptionRef)
  where
    S: Subscriber<T, E>,
  {
    self.subscription = Some(subscription.clone());
    if let Some(downstream) = self.downstream.as_mut() {
      downstream.receive_subscription(subscription);
    }
  }

  fn forward<T, E>(&mut self, value: T) -> Demand
  where
    S: Subscriber<T, E>,
  {
    match self.downstream.as_mut() {
      Some(downstream) => downstream.receive(value),
      None => Demand::NONE,
    }
  }

  fn fail<T, E>(&mut self, err: E) -> Demand
  where
    S: Subscriber<T, E>,
  {
    if let Some(subscription) = self.subscription.take() {
      subscription.cancel();
    }
    if let Some(downstream) = self.downstream.take() {
      downstream.receive_completion(Completion::Failed(err));
    }
    Demand::NONE
  }

  fn complete<T, E>(mut self, completion: Completion<E>)
  where
    S: Subscriber<T, E>,
  {
    if let Some(downstream) = self.downstream.take() {
      downstream.receive_completion(completion);
    }
  }
}
