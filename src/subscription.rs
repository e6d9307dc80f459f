//! The control channel between a subscriber and its upstream.
//!
//! A [`Subscription`] is handed to a subscriber exactly once, through
//! [`Subscriber::receive_subscription`](crate::subscriber::Subscriber). The
//! subscriber uses it to grant [`Demand`] and to cancel.

use std::sync::Arc;

use crate::demand::Demand;

mod cancellable;
mod demand_pool;
mod registry;
mod upstream;

pub use cancellable::{Cancellable, SubscriptionGuard};
pub(crate) use demand_pool::DemandPool;
pub use registry::Registry;
pub(crate) use upstream::Upstream;

/// Upstream-facing control handle held by a subscriber.
///
/// Both methods may be called from any thread, and from inside the
/// subscriber's own `receive` callbacks. Once `cancel` has been called,
/// further requests are no-ops and nothing more is delivered.
pub trait Subscription: Send + Sync + 'static {
  /// Grant additional demand. Demand is cumulative.
  fn request(&self, demand: Demand);

  /// Stop the flow. Idempotent.
  fn cancel(&self);
}

/// The shared form a subscription travels in.
pub type SubscriptionRef = Arc<dyn Subscription>;

/// Subscription of a publisher that has nothing left to produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySubscription;

impl EmptySubscription {
  #[inline]
  pub fn shared() -> SubscriptionRef { Arc::new(EmptySubscription) }
}

impl Subscription for EmptySubscription {
  #[inline]
  fn request(&self, _demand: Demand) {}

  #[inline]
  fn cancel(&self) {}
}

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn request(&self, demand: Demand) { (**self).request(demand) }

  #[inline]
  fn cancel(&self) { (**self).cancel() }
}
