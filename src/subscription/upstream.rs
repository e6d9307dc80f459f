use parking_lot::Mutex;

use super::SubscriptionRef;
use crate::demand::Demand;

/// Slot for the subscription of one upstream.
///
/// Operator nodes usually learn about their upstream subscription *after*
/// they have handed their own subscription downstream, so demand and
/// cancellation can arrive before there is anything to forward them to. The
/// slot accumulates demand while pending, replays it once the subscription
/// arrives, and cancels a late subscription if the slot was already cancelled.
///
/// No lock is held while calling into the upstream subscription.
pub(crate) struct Upstream {
  state: Mutex<UpstreamState>,
}

enum UpstreamState {
  Pending(Demand),
  Active(SubscriptionRef),
  Terminated,
}

impl Default for Upstream {
  fn default() -> Self { Self::new() }
}

impl Upstream {
  pub(crate) fn new() -> Self { Self { state: Mutex::new(UpstreamState::Pending(Demand::NONE)) } }

  /// Install the upstream subscription, replaying any demand accumulated
  /// while pending.
  pub(crate) fn set(&self, subscription: SubscriptionRef) {
    let mut state = self.state.lock();
    let pending = match &*state {
      UpstreamState::Pending(demand) => Some(*demand),
      UpstreamState::Active(_) => {
        tracing::warn!("upstream delivered a second subscription; cancelling it");
        debug_assert!(false, "a single-upstream node received two subscriptions");
        None
      }
      UpstreamState::Terminated => None,
    };
    match pending {
      Some(demand) => {
        *state = UpstreamState::Active(subscription.clone());
        drop(state);
        if !demand.is_none() {
          subscription.request(demand);
        }
      }
      None => {
        drop(state);
        subscription.cancel();
      }
    }
  }

  pub(crate) fn request(&self, demand: Demand) {
    if demand.is_none() {
      return;
    }
    let active = match &mut *self.state.lock() {
      UpstreamState::Pending(pending) => {
        *pending += demand;
        None
      }
      UpstreamState::Active(subscription) => Some(subscription.clone()),
      UpstreamState::Terminated => None,
    };
    if let Some(subscription) = active {
      subscription.request(demand);
    }
  }

  /// Cancel the upstream. Idempotent.
  pub(crate) fn cancel(&self) {
    let previous = std::mem::replace(&mut *self.state.lock(), UpstreamState::Terminated);
    if let UpstreamState::Active(subscription) = previous {
      subscription.cancel();
    }
  }

  /// Forget the upstream after it has completed, without cancelling it.
  pub(crate) fn release(&self) { *self.state.lock() = UpstreamState::Terminated; }

  /// Go back to pending so a new upstream can be installed, carrying `demand`
  /// over to it.
  pub(crate) fn reset(&self, demand: Demand) {
    *self.state.lock() = UpstreamState::Pending(demand);
  }

  #[cfg(test)]
  pub(crate) fn is_terminated(&self) -> bool {
    matches!(&*self.state.lock(), UpstreamState::Terminated)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{rc::MutArc, subscription::Subscription};

  #[derive(Default, Clone)]
  struct Probe {
    requested: MutArc<Vec<Demand>>,
    cancelled: MutArc<bool>,
  }

  impl Subscription for Probe {
    fn request(&self, demand: Demand) { self.requested.lock().push(demand); }

    fn cancel(&self) { *self.cancelled.lock() = true; }
  }

  #[test]
  fn replays_pending_demand() {
    let slot = Upstream::new();
    slot.request(Demand::max(2));
    slot.request(Demand::max(3));
    let probe = Probe::default();
    slot.set(Arc::new(probe.clone()));
    assert_eq!(*probe.requested.lock(), vec![Demand::max(5)]);

    slot.request(Demand::max(1));
    assert_eq!(*probe.requested.lock(), vec![Demand::max(5), Demand::max(1)]);
  }

  #[test]
  fn late_subscription_after_cancel_is_cancelled() {
    let slot = Upstream::new();
    slot.cancel();
    let probe = Probe::default();
    slot.set(Arc::new(probe.clone()));
    assert!(*probe.cancelled.lock());
    assert!(probe.requested.lock().is_empty());
  }

  #[test]
  fn release_does_not_cancel() {
    let slot = Upstream::new();
    let probe = Probe::default();
    slot.set(Arc::new(probe.clone()));
    slot.release();
    slot.cancel();
    assert!(!*probe.cancelled.lock());
    assert!(slot.is_terminated());
  }

  #[test]
  fn reset_carries_demand_to_next_upstream() {
    let slot = Upstream::new();
    let first = Probe::default();
    slot.set(Arc::new(first.clone()));
    slot.reset(Demand::max(4));
    let second = Probe::default();
    slot.set(Arc::new(second.clone()));
    assert_eq!(*second.requested.lock(), vec![Demand::max(4)]);
    assert!(!*first.cancelled.lock());
  }
}
