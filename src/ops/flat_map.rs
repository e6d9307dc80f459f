//! FlatMap: one inner publisher per upstream value, flattened into one stream.
//!
//! Downstream demand is shared out among the active inner publishers
//! round-robin, so together they never produce more than the downstream
//! asked for; demand granted while no inner is active waits for the next one.
//! At most `max_concurrent` inner publishers are active at a time, the
//! upstream is asked for the next value whenever one of them finishes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{DemandPool, Subscription, SubscriptionRef, Upstream},
};

#[derive(Clone)]
pub struct FlatMap<P, F> {
  pub(crate) source: P,
  pub(crate) func: F,
  pub(crate) max_concurrent: Demand,
}

impl<P, F, Q> Publisher for FlatMap<P, F>
where
  P: Publisher,
  F: FnMut(P::Output) -> Q + Send + 'static,
  Q: Publisher<Failure = P::Failure>,
{
  type Output = Q::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Q::Output, P::Failure>,
  {
    let node = Arc::new(FlatMapNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      state: Mutex::new(FlatMapState { inners: DemandPool::new(), upstream_done: false, terminated: false }),
    });
    node.outlet.attach(node.clone());
    node.upstream.request(self.max_concurrent);
    let limited = !self.max_concurrent.is_unlimited();
    self.source.subscribe(FlatMapOuter { node, func: self.func, limited });
  }
}

struct FlatMapNode<T, E, S> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  state: Mutex<FlatMapState>,
}

struct FlatMapState {
  inners: DemandPool<Arc<Upstream>>,
  upstream_done: bool,
  terminated: bool,
}

impl<T, E, S> FlatMapNode<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  /// Add `demand` to the budget and request the shares it yields. The share
  /// of inner `own` is returned instead of requested.
  fn grant(&self, demand: Demand, own: Option<usize>) -> Demand {
    let grants = {
      let mut state = self.state.lock();
      state.inners.deposit(demand);
      state.inners.distribute()
    };
    let mut kept = Demand::NONE;
    for (id, slot, share) in grants {
      if Some(id) == own {
        kept += share;
      } else {
        slot.request(share);
      }
    }
    kept
  }

  fn fail(&self, err: E) {
    let inners: Vec<Arc<Upstream>> = {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      state.terminated = true;
      state.inners.drain().collect()
    };
    self.upstream.cancel();
    for inner in inners {
      inner.cancel();
    }
    self.outlet.complete(Completion::Failed(err));
  }

  fn finish_if_done(&self) {
    let done = {
      let mut state = self.state.lock();
      let done = !state.terminated && state.upstream_done && state.inners.is_empty();
      state.terminated |= done;
      done
    };
    if done {
      self.outlet.complete(Completion::Finished);
    }
  }
}

impl<T, E, S> Subscription for FlatMapNode<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn request(&self, demand: Demand) {
    let extra = self.outlet.request(demand);
    self.grant(demand + extra, None);
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
    let inners: Vec<Arc<Upstream>> = {
      let mut state = self.state.lock();
      state.terminated = true;
      state.inners.drain().collect()
    };
    for inner in inners {
      inner.cancel();
    }
  }
}

struct FlatMapOuter<T, E, S, F> {
  node: Arc<FlatMapNode<T, E, S>>,
  func: F,
  limited: bool,
}

impl<In, T, E, S, F, Q> Subscriber<In, E> for FlatMapOuter<T, E, S, F>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  F: FnMut(In) -> Q + Send + 'static,
  Q: Publisher<Output = T, Failure = E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.node.upstream.set(subscription) }

  fn receive(&mut self, input: In) -> Demand {
    let inner = (self.func)(input);
    let slot = Arc::new(Upstream::new());
    let id = {
      let mut state = self.node.state.lock();
      if state.terminated {
        return Demand::NONE;
      }
      state.inners.add(slot.clone())
    };
    // Waiting budget, if any, goes to the new inner.
    self.node.grant(Demand::NONE, None);
    inner.subscribe(FlatMapInner { node: self.node.clone(), id, slot, limited: self.limited });
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.node.upstream.release();
    match completion {
      Completion::Finished => {
        self.node.state.lock().upstream_done = true;
        self.node.finish_if_done();
      }
      Completion::Failed(err) => self.node.fail(err),
    }
  }
}

struct FlatMapInner<T, E, S> {
  node: Arc<FlatMapNode<T, E, S>>,
  id: usize,
  slot: Arc<Upstream>,
  limited: bool,
}

impl<T, E, S> Subscriber<T, E> for FlatMapInner<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.slot.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    self.node.state.lock().inners.delivered(self.id);
    let extra = self.node.outlet.push(input);
    self.node.grant(extra, Some(self.id))
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.slot.release();
    match completion {
      Completion::Finished => {
        self.node.state.lock().inners.remove(self.id);
        self.node.grant(Demand::NONE, None);
        if self.limited {
          self.node.upstream.request(Demand::max(1));
        }
        self.node.finish_if_done();
      }
      Completion::Failed(err) => self.node.fail(err),
    }
  }
}
