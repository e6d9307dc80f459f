//! Zip: pairs the n-th value of one input with the n-th value of the other.
//!
//! Buffering policy is chosen with [`ZipBuffer`]:
//!
//! * `Unbounded` (default) requests unlimited demand from both inputs and
//!   buffers whatever is not paired yet. Downstream demand only throttles the
//!   delivery of pairs. Memory grows with the skew between the inputs.
//! * `Bounded(n)` prefetches `n` values from each input and then forwards
//!   downstream demand to both inputs 1:1. At most `n` unpaired values per
//!   input plus `n` undelivered pairs are held, at the price of a slow input
//!   stalling the fast one.
//!
//! The zip finishes as soon as one input has finished and has no buffered
//! value left, since no further pair can be formed. A failure of either input
//! fails the zip immediately and cancels the other.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZipBuffer {
  #[default]
  Unbounded,
  Bounded(usize),
}

#[derive(Clone)]
pub struct Zip<A, B> {
  pub(crate) a: A,
  pub(crate) b: B,
  pub(crate) buffer: ZipBuffer,
}

impl<A, B> Publisher for Zip<A, B>
where
  A: Publisher,
  B: Publisher<Failure = A::Failure>,
{
  type Output = (A::Output, B::Output);
  type Failure = A::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<(A::Output, B::Output), A::Failure>,
  {
    let node = Arc::new(ZipNode {
      outlet: Outlet::new(subscriber),
      left: Upstream::new(),
      right: Upstream::new(),
      state: Mutex::new(ZipState {
        left: VecDeque::new(),
        right: VecDeque::new(),
        left_done: false,
        right_done: false,
        finished: false,
        failed: false,
      }),
      buffer: self.buffer,
    });
    node.outlet.attach(node.clone());
    let prefetch = match self.buffer {
      ZipBuffer::Unbounded => Demand::Unlimited,
      ZipBuffer::Bounded(n) => Demand::max(n),
    };
    node.left.request(prefetch);
    node.right.request(prefetch);
    self.a.subscribe(ZipLeft(node.clone()));
    self.b.subscribe(ZipRight(node));
  }
}

struct ZipNode<L, R, E, S> {
  outlet: Outlet<(L, R), E, S>,
  left: Upstream,
  right: Upstream,
  state: Mutex<ZipState<L, R>>,
  buffer: ZipBuffer,
}

struct ZipState<L, R> {
  left: VecDeque<L>,
  right: VecDeque<R>,
  left_done: bool,
  right_done: bool,
  finished: bool,
  failed: bool,
}

impl<L, R> ZipState<L, R> {
  /// An input that finished with nothing left to pair ends the zip.
  fn exhausted(&self) -> bool {
    (self.left_done && self.left.is_empty()) || (self.right_done && self.right.is_empty())
  }
}

impl<L, R, E, S> ZipNode<L, R, E, S>
where
  L: Send + 'static,
  R: Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn emit(&self, pair: Option<(L, R)>) {
    if let Some(pair) = pair {
      let extra = self.outlet.push(pair);
      if matches!(self.buffer, ZipBuffer::Bounded(_)) {
        self.left.request(extra);
        self.right.request(extra);
      }
    }
    let finish = {
      let mut state = self.state.lock();
      let finish = !state.finished && !state.failed && state.exhausted();
      state.finished |= finish;
      if finish {
        state.left.clear();
        state.right.clear();
      }
      finish
    };
    if finish {
      self.left.cancel();
      self.right.cancel();
      self.outlet.complete(Completion::Finished);
    }
  }

  fn fail(&self, err: E) {
    {
      let mut state = self.state.lock();
      if state.failed {
        return;
      }
      state.failed = true;
      state.left.clear();
      state.right.clear();
    }
    self.left.cancel();
    self.right.cancel();
    self.outlet.complete(Completion::Failed(err));
  }
}

impl<L, R, E, S> Subscription for ZipNode<L, R, E, S>
where
  L: Send + 'static,
  R: Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn request(&self, demand: Demand) {
    let extra = self.outlet.request(demand);
    if matches!(self.buffer, ZipBuffer::Bounded(_)) {
      self.left.request(demand + extra);
      self.right.request(demand + extra);
    }
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.left.cancel();
    self.right.cancel();
  }
}

struct ZipLeft<L, R, E, S>(Arc<ZipNode<L, R, E, S>>);

impl<L, R, E, S> Subscriber<L, E> for ZipLeft<L, R, E, S>
where
  L: Send + 'static,
  R: Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.left.set(subscription) }

  fn receive(&mut self, input: L) -> Demand {
    let pair = {
      let mut state = self.0.state.lock();
      if state.finished || state.failed {
        return Demand::NONE;
      }
      match state.right.pop_front() {
        Some(right) => Some((input, right)),
        None => {
          state.left.push_back(input);
          None
        }
      }
    };
    if pair.is_some() {
      self.0.emit(pair);
    }
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.left.release();
    match completion {
      Completion::Finished => {
        self.0.state.lock().left_done = true;
        self.0.emit(None);
      }
      Completion::Failed(err) => self.0.fail(err),
    }
  }
}

struct ZipRight<L, R, E, S>(Arc<ZipNode<L, R, E, S>>);

impl<L, R, E, S> Subscriber<R, E> for ZipRight<L, R, E, S>
where
  L: Send + 'static,
  R: Send + 'static,
  E: Send + 'static,
  S: Subscriber<(L, R), E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.right.set(subscription) }

  fn receive(&mut self, input: R) -> Demand {
    let pair = {
      let mut state = self.0.state.lock();
      if state.finished || state.failed {
        return Demand::NONE;
      }
      match state.left.pop_front() {
        Some(left) => Some((left, input)),
        None => {
          state.right.push_back(input);
          None
        }
      }
    };
    if pair.is_some() {
      self.0.emit(pair);
    }
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.right.release();
    match completion {
      Completion::Finished => {
        self.0.state.lock().right_done = true;
        self.0.emit(None);
      }
      Completion::Failed(err) => self.0.fail(err),
    }
  }
}
