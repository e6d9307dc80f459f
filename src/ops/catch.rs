use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  outlet::Outlet,
  publisher::{Just, Publisher},
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

/// On failure, continues with the publisher `handler` builds from the error.
///
/// Demand the downstream granted but the failed upstream never used is
/// carried over to the replacement. `Finished` is forwarded as is.
#[derive(Clone)]
pub struct Catch<P, F> {
  pub(crate) source: P,
  pub(crate) handler: F,
}

pub type ReplaceError<P, T, E> = Catch<P, Box<dyn FnOnce(E) -> Just<T> + Send>>;

impl<P, F, Q> Publisher for Catch<P, F>
where
  P: Publisher,
  F: FnOnce(P::Failure) -> Q + Send + 'static,
  Q: Publisher<Output = P::Output>,
{
  type Output = P::Output;
  type Failure = Q::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, Q::Failure>,
  {
    let node = Arc::new(CatchNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      outstanding: Mutex::new(Demand::NONE),
    });
    node.outlet.attach(node.clone());
    self.source.subscribe(CatchPrimary { node, handler: self.handler });
  }
}

struct CatchNode<T, E, S> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  // Demand granted to the current upstream and not yet used.
  outstanding: Mutex<Demand>,
}

impl<T, E, S> CatchNode<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn deliver(&self, value: T) -> Demand {
    *self.outstanding.lock() -= 1;
    let extra = self.outlet.push(value);
    *self.outstanding.lock() += extra;
    extra
  }
}

impl<T, E, S> Subscription for CatchNode<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn request(&self, demand: Demand) {
    let total = demand + self.outlet.request(demand);
    *self.outstanding.lock() += total;
    self.upstream.request(total);
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
  }
}

struct CatchPrimary<T, E, S, F> {
  node: Arc<CatchNode<T, E, S>>,
  handler: F,
}

impl<T, E, E0, S, F, Q> Subscriber<T, E0> for CatchPrimary<T, E, S, F>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  F: FnOnce(E0) -> Q + Send + 'static,
  Q: Publisher<Output = T, Failure = E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.node.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand { self.node.deliver(input) }

  fn receive_completion(self, completion: Completion<E0>) {
    let err = match completion {
      Completion::Finished => {
        self.node.upstream.release();
        self.node.outlet.complete(Completion::Finished);
        return;
      }
      Completion::Failed(err) => err,
    };
    let carry = *self.node.outstanding.lock();
    self.node.upstream.reset(carry);
    if self.node.outlet.is_closed() {
      self.node.upstream.cancel();
      return;
    }
    tracing::debug!("upstream failed, switching to the replacement publisher");
    (self.handler)(err).subscribe(CatchSecondary { node: self.node });
  }
}

struct CatchSecondary<T, E, S> {
  node: Arc<CatchNode<T, E, S>>,
}

impl<T, E, S> Subscriber<T, E> for CatchSecondary<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.node.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand { self.node.deliver(input) }

  fn receive_completion(self, completion: Completion<E>) {
    self.node.upstream.release();
    self.node.outlet.complete(completion);
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  fn fails_on_sixth() -> impl Publisher<Output = i32, Failure = &'static str> {
    from_iter(1..=10).set_failure_type().try_map(|v| if v == 6 { Err("six") } else { Ok(v) })
  }

  #[test]
  fn switches_to_the_fallback() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    fails_on_sixth().catch(|_| just(0)).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2, 3, 4, 5, 0]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn leftover_demand_moves_to_the_fallback() {
    let (subscriber, recorder) = TestSubscriber::new(Demand::max(7));
    fails_on_sixth().catch(|_| from_iter(100..200)).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2, 3, 4, 5, 100, 101]);
    assert!(!recorder.is_completed());
  }

  #[test]
  fn finished_is_not_intercepted() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter(0..2).set_failure_type::<()>().catch(|_| just(9)).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![0, 1]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn fallback_may_fail_with_another_type() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    fail::<i32, _>("first").catch(|e: &str| fail::<i32, _>(e.len())).subscribe(subscriber);
    assert_eq!(recorder.failure(), Some(5));
  }

  #[test]
  fn replace_error() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    Record::failing([1, 2], "oops").replace_error(-1).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 2, -1]);
    assert!(recorder.is_finished());
  }
}
