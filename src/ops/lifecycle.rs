//! Lifecycle hooks: side effects on every event of a chain.
//!
//! `handle_events` runs the callbacks of an [`EventHooks`] synchronously as
//! events pass through, without altering them. `print` is the diagnostic
//! flavour: it logs every event through `tracing`.

use std::{fmt::Debug, sync::Arc};

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef},
};

type Hook<A> = Option<Box<dyn Fn(A) + Send + Sync>>;

/// Callbacks for [`handle_events`](crate::ops::PublisherExt::handle_events).
///
/// Every hook is optional:
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let hooks = EventHooks::<i32, ()>::new()
///   .on_value(|v| assert!(*v > 0))
///   .on_completion(|c| assert!(!c.is_failure()));
/// ```
pub struct EventHooks<T, E> {
  subscription: Hook<()>,
  value: Option<Box<dyn Fn(&T) + Send + Sync>>,
  completion: Option<Box<dyn Fn(&Completion<E>) + Send + Sync>>,
  cancel: Hook<()>,
  request: Hook<Demand>,
}

impl<T, E> Default for EventHooks<T, E> {
  fn default() -> Self { Self { subscription: None, value: None, completion: None, cancel: None, request: None } }
}

impl<T, E> EventHooks<T, E> {
  pub fn new() -> Self { Self::default() }

  pub fn on_subscription(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.subscription = Some(Box::new(move |()| f()));
    self
  }

  pub fn on_value(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
    self.value = Some(Box::new(f));
    self
  }

  pub fn on_completion(mut self, f: impl Fn(&Completion<E>) + Send + Sync + 'static) -> Self {
    self.completion = Some(Box::new(f));
    self
  }

  pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.cancel = Some(Box::new(move |()| f()));
    self
  }

  pub fn on_request(mut self, f: impl Fn(Demand) + Send + Sync + 'static) -> Self {
    self.request = Some(Box::new(f));
    self
  }
}

// ==================== HandleEvents ====================

pub struct HandleEvents<P: Publisher> {
  pub(crate) source: P,
  pub(crate) hooks: Arc<EventHooks<P::Output, P::Failure>>,
}

impl<P: Publisher + Clone> Clone for HandleEvents<P> {
  fn clone(&self) -> Self { Self { source: self.source.clone(), hooks: self.hooks.clone() } }
}

impl<P: Publisher> Publisher for HandleEvents<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    self.source.subscribe(HandleEventsSubscriber { downstream: subscriber, hooks: self.hooks })
  }
}

pub struct HandleEventsSubscriber<S, T, E> {
  downstream: S,
  hooks: Arc<EventHooks<T, E>>,
}

impl<S, T, E> Subscriber<T, E> for HandleEventsSubscriber<S, T, E>
where
  S: Subscriber<T, E>,
  T: 'static,
  E: 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    if let Some(hook) = &self.hooks.subscription {
      hook(());
    }
    let hooked = HookedSubscription { inner: subscription, hooks: self.hooks.clone() };
    self.downstream.receive_subscription(Arc::new(hooked))
  }

  fn receive(&mut self, input: T) -> Demand {
    if let Some(hook) = &self.hooks.value {
      hook(&input);
    }
    self.downstream.receive(input)
  }

  fn receive_completion(self, completion: Completion<E>) {
    if let Some(hook) = &self.hooks.completion {
      hook(&completion);
    }
    self.downstream.receive_completion(completion)
  }
}

struct HookedSubscription<T, E> {
  inner: SubscriptionRef,
  hooks: Arc<EventHooks<T, E>>,
}

impl<T: 'static, E: 'static> Subscription for HookedSubscription<T, E> {
  fn request(&self, demand: Demand) {
    if let Some(hook) = &self.hooks.request {
      hook(demand);
    }
    self.inner.request(demand)
  }

  fn cancel(&self) {
    if let Some(hook) = &self.hooks.cancel {
      hook(());
    }
    self.inner.cancel()
  }
}

// ==================== Print ====================

/// Hooks logging every event at `info` level under the `rxflow::print`
/// target.
pub(crate) fn print_hooks<T: Debug, E: Debug>(prefix: &str) -> EventHooks<T, E> {
  let prefix: Arc<str> = Arc::from(prefix);
  let (p1, p2, p3, p4, p5) = (prefix.clone(), prefix.clone(), prefix.clone(), prefix.clone(), prefix);
  EventHooks::new()
    .on_subscription(move || tracing::info!(target: "rxflow::print", prefix = %p1, "receive subscription"))
    .on_value(move |v| tracing::info!(target: "rxflow::print", prefix = %p2, value = ?v, "receive value"))
    .on_completion(move |c| tracing::info!(target: "rxflow::print", prefix = %p3, completion = ?c, "receive completion"))
    .on_request(move |d| tracing::info!(target: "rxflow::print", prefix = %p4, demand = %d, "request"))
    .on_cancel(move || tracing::info!(target: "rxflow::print", prefix = %p5, "cancel"))
}
