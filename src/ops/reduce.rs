use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

/// Folds the whole stream into one value, emitted when the upstream finishes.
///
/// Requests unlimited demand upstream as soon as the downstream asks for
/// anything. An empty upstream yields `seed`.
#[derive(Clone)]
pub struct Reduce<P, F, B> {
  pub(crate) source: P,
  pub(crate) func: F,
  pub(crate) seed: B,
}

pub type Collect<P, T> = Reduce<P, fn(Vec<T>, T) -> Vec<T>, Vec<T>>;
pub type Count<P, T> = Reduce<P, fn(usize, T) -> usize, usize>;

pub(crate) fn push_item<T>(mut items: Vec<T>, item: T) -> Vec<T> {
  items.push(item);
  items
}

pub(crate) fn count_item<T>(count: usize, _: T) -> usize { count + 1 }

impl<P, F, B> Publisher for Reduce<P, F, B>
where
  P: Publisher,
  F: FnMut(B, P::Output) -> B + Send + 'static,
  B: Send + 'static,
{
  type Output = B;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<B, P::Failure>,
  {
    let node = Arc::new(ReduceNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      started: AtomicBool::new(false),
    });
    node.outlet.attach(node.clone());
    self.source.subscribe(ReduceSubscriber { node, func: self.func, acc: Some(self.seed) });
  }
}

struct ReduceNode<B, E, S> {
  outlet: Outlet<B, E, S>,
  upstream: Upstream,
  started: AtomicBool,
}

impl<B, E, S> Subscription for ReduceNode<B, E, S>
where
  B: Send + 'static,
  E: Send + 'static,
  S: Subscriber<B, E>,
{
  fn request(&self, demand: Demand) {
    self.outlet.request(demand);
    if !demand.is_none() && !self.started.swap(true, Ordering::AcqRel) {
      self.upstream.request(Demand::Unlimited);
    }
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
  }
}

struct ReduceSubscriber<B, E, S, F> {
  node: Arc<ReduceNode<B, E, S>>,
  func: F,
  acc: Option<B>,
}

impl<T, B, E, S, F> Subscriber<T, E> for ReduceSubscriber<B, E, S, F>
where
  B: Send + 'static,
  E: Send + 'static,
  S: Subscriber<B, E>,
  F: FnMut(B, T) -> B + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.node.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    if let Some(acc) = self.acc.take() {
      self.acc = Some((self.func)(acc, input));
    }
    Demand::NONE
  }

  fn receive_completion(mut self, completion: Completion<E>) {
    self.node.upstream.release();
    if let (Completion::Finished, Some(acc)) = (&completion, self.acc.take()) {
      self.node.outlet.push(acc);
    }
    self.node.outlet.complete(completion);
  }
}
