use std::sync::Arc;

use crate::{
  demand::Demand,
  publisher::Publisher,
  scheduler::Scheduler,
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef},
};

/// Subscribes to the upstream on `scheduler`, and sends every later request
/// and cancel to it through `scheduler` as well. Values and the completion are
/// delivered wherever the upstream produces them.
#[derive(Clone)]
pub struct SubscribeOn<P, Sch> {
  pub(crate) source: P,
  pub(crate) scheduler: Sch,
}

impl<P, Sch> Publisher for SubscribeOn<P, Sch>
where
  P: Publisher + Send + 'static,
  Sch: Scheduler,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    let Self { source, scheduler } = self;
    let downstream = SubscribeOnSubscriber { downstream: subscriber, scheduler: scheduler.clone() };
    scheduler.schedule(move || source.subscribe(downstream));
  }
}

struct SubscribeOnSubscriber<S, Sch> {
  downstream: S,
  scheduler: Sch,
}

impl<T, E, S, Sch> Subscriber<T, E> for SubscribeOnSubscriber<S, Sch>
where
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    let scheduled = ScheduledSubscription { upstream: subscription, scheduler: self.scheduler.clone() };
    self.downstream.receive_subscription(Arc::new(scheduled));
  }

  fn receive(&mut self, input: T) -> Demand { self.downstream.receive(input) }

  fn receive_completion(self, completion: Completion<E>) { self.downstream.receive_completion(completion) }
}

struct ScheduledSubscription<Sch> {
  upstream: SubscriptionRef,
  scheduler: Sch,
}

impl<Sch: Scheduler> Subscription for ScheduledSubscription<Sch> {
  fn request(&self, demand: Demand) {
    let upstream = self.upstream.clone();
    self.scheduler.schedule(move || upstream.request(demand));
  }

  fn cancel(&self) {
    let upstream = self.upstream.clone();
    self.scheduler.schedule(move || upstream.cancel());
  }
}
