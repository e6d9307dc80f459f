use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use super::SubscriptionRef;

/// Handle returned by the convenience consumers (`sink`, `sink_value`).
///
/// Dropping a `Cancellable` does **not** cancel anything; the owner decides
/// when the flow stops by calling [`cancel`](Cancellable::cancel). Use
/// [`cancel_when_dropped`](Cancellable::cancel_when_dropped) to opt into
/// scoped behaviour.
#[derive(Clone, Default)]
pub struct Cancellable {
  inner: Arc<CancelSlot>,
}

#[derive(Default)]
struct CancelSlot {
  cancelled: AtomicBool,
  subscription: Mutex<Option<SubscriptionRef>>,
}

impl Cancellable {
  pub(crate) fn new() -> Self { Self::default() }

  /// Attach the live subscription. Returns `false` and cancels it if this
  /// handle has already been cancelled.
  pub(crate) fn bind(&self, subscription: SubscriptionRef) -> bool {
    let mut slot = self.inner.subscription.lock();
    if self.inner.cancelled.load(Ordering::Acquire) {
      drop(slot);
      subscription.cancel();
      return false;
    }
    *slot = Some(subscription);
    true
  }

  /// Drop the subscription reference once the stream has terminated.
  pub(crate) fn release(&self) { self.inner.subscription.lock().take(); }

  /// Cancel the underlying subscription. Idempotent.
  pub fn cancel(&self) {
    let subscription = {
      let mut slot = self.inner.subscription.lock();
      self.inner.cancelled.store(true, Ordering::Release);
      slot.take()
    };
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }

  pub fn is_cancelled(&self) -> bool { self.inner.cancelled.load(Ordering::Acquire) }

  /// Activates RAII behaviour: the subscription is cancelled as soon as the
  /// returned guard goes out of scope.
  ///
  /// **Attention:** if the guard is not bound to a variable it is dropped,
  /// and the subscription cancelled, immediately.
  pub fn cancel_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(Some(self)) }
}

/// Cancels its subscription when dropped.
#[must_use]
pub struct SubscriptionGuard(Option<Cancellable>);

impl SubscriptionGuard {
  pub fn new(cancellable: Cancellable) -> Self { SubscriptionGuard(Some(cancellable)) }

  /// Give up the scoped behaviour and take the plain handle back.
  pub fn into_inner(mut self) -> Cancellable { self.0.take().unwrap_or_default() }
}

impl Drop for SubscriptionGuard {
  fn drop(&mut self) {
    if let Some(cancellable) = self.0.take() {
      cancellable.cancel();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{demand::Demand, rc::MutArc, subscription::Subscription};

  #[derive(Default, Clone)]
  struct Flag(MutArc<bool>);

  impl Subscription for Flag {
    fn request(&self, _: Demand) {}

    fn cancel(&self) { *self.0.lock() = true; }
  }

  #[test]
  fn cancel_before_bind_cancels_late_subscription() {
    let handle = Cancellable::new();
    handle.cancel();
    let flag = Flag::default();
    assert!(!handle.bind(Arc::new(flag.clone())));
    assert!(*flag.0.lock());
  }

  #[test]
  fn dropping_the_handle_keeps_the_subscription() {
    let flag = Flag::default();
    {
      let handle = Cancellable::new();
      handle.bind(Arc::new(flag.clone()));
    }
    assert!(!*flag.0.lock());
  }

  #[test]
  fn guard_cancels_on_drop() {
    let flag = Flag::default();
    {
      let handle = Cancellable::new();
      handle.bind(Arc::new(flag.clone()));
      let _guard = handle.cancel_when_dropped();
    }
    assert!(*flag.0.lock());
  }

  #[test]
  fn into_inner_disarms_guard() {
    let flag = Flag::default();
    let handle = Cancellable::new();
    handle.bind(Arc::new(flag.clone()));
    let plain = handle.cancel_when_dropped().into_inner();
    assert!(!*flag.0.lock());
    plain.cancel();
    assert!(*flag.0.lock());
    assert!(plain.is_cancelled());
  }
}
