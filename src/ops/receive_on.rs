use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  scheduler::Scheduler,
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

/// Delivers values and the completion to the downstream on `scheduler`.
///
/// Signals are handed over through a queue drained by one scheduled task at a
/// time, so their order survives schedulers that run tasks concurrently.
/// Demand is forwarded upstream 1:1.
#[derive(Clone)]
pub struct ReceiveOn<P, Sch> {
  pub(crate) source: P,
  pub(crate) scheduler: Sch,
}

impl<P, Sch> Publisher for ReceiveOn<P, Sch>
where
  P: Publisher,
  Sch: Scheduler,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    let node = Arc::new(ReceiveOnNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      scheduler: self.scheduler,
      handover: Mutex::new(Handover { queue: VecDeque::new(), scheduled: false }),
    });
    node.outlet.attach(node.clone());
    self.source.subscribe(ReceiveOnSubscriber(node));
  }
}

enum Signal<T, E> {
  Value(T),
  Completion(Completion<E>),
}

struct ReceiveOnNode<T, E, S, Sch> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  scheduler: Sch,
  handover: Mutex<Handover<T, E>>,
}

struct Handover<T, E> {
  queue: VecDeque<Signal<T, E>>,
  scheduled: bool,
}

impl<T, E, S, Sch> ReceiveOnNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn hand_over(self: &Arc<Self>, signal: Signal<T, E>) {
    let schedule = {
      let mut handover = self.handover.lock();
      handover.queue.push_back(signal);
      !std::mem::replace(&mut handover.scheduled, true)
    };
    if schedule {
      let node = self.clone();
      self.scheduler.schedule(move || node.deliver());
    }
  }

  fn deliver(&self) {
    loop {
      let signal = {
        let mut handover = self.handover.lock();
        match handover.queue.pop_front() {
          Some(signal) => signal,
          None => {
            handover.scheduled = false;
            return;
          }
        }
      };
      match signal {
        Signal::Value(value) => {
          let extra = self.outlet.push(value);
          self.upstream.request(extra);
        }
        Signal::Completion(completion) => self.outlet.complete(completion),
      }
    }
  }
}

impl<T, E, S, Sch> Subscription for ReceiveOnNode<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn request(&self, demand: Demand) {
    let extra = self.outlet.request(demand);
    self.upstream.request(demand + extra);
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
    self.handover.lock().queue.clear();
  }
}

struct ReceiveOnSubscriber<T, E, S, Sch>(Arc<ReceiveOnNode<T, E, S, Sch>>);

impl<T, E, S, Sch> Subscriber<T, E> for ReceiveOnSubscriber<T, E, S, Sch>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    self.0.hand_over(Signal::Value(input));
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.upstream.release();
    self.0.hand_over(Signal::Completion(completion));
  }
}
