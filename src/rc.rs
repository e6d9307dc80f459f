//! Shared mutable cells.
//!
//! `MutArc` is the one shared-ownership cell used across the engine. Locks are
//! `parking_lot` mutexes, so there is no poisoning to handle, but they are not
//! re-entrant: never call into a subscriber while holding a guard.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  #[inline]
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn lock(&self) -> MutexGuard<'_, T> { self.0.lock() }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Default> Default for MutArc<T> {
  fn default() -> Self { Self::own(T::default()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_state() {
    let a = MutArc::own(1);
    let b = a.clone();
    *b.lock() += 1;
    assert_eq!(*a.lock(), 2);
    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&MutArc::own(2)));
  }
}
