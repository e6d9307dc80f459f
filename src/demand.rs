//! Flow-control credit.
//!
//! A [`Demand`] is how many values a subscriber is still willing to receive.
//! It is either a finite count or [`Demand::Unlimited`]. Arithmetic never goes
//! negative: subtraction saturates at zero and addition saturates into
//! `Unlimited`.

use std::{
  cmp::Ordering,
  fmt,
  ops::{Add, AddAssign, Sub, SubAssign},
};

/// Number of values a subscriber is prepared to receive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Demand {
  /// Deliver values as fast as they are produced.
  Unlimited,
  /// Deliver at most this many values.
  Max(usize),
}

impl Demand {
  /// Zero demand: nothing may be delivered.
  pub const NONE: Demand = Demand::Max(0);

  /// Unlimited demand.
  pub const UNLIMITED: Demand = Demand::Unlimited;

  #[inline]
  pub const fn max(count: usize) -> Self { Demand::Max(count) }

  #[inline]
  pub const fn is_none(&self) -> bool { matches!(self, Demand::Max(0)) }

  #[inline]
  pub const fn is_unlimited(&self) -> bool { matches!(self, Demand::Unlimited) }

  /// The finite count, or `None` when unlimited.
  #[inline]
  pub const fn max_value(&self) -> Option<usize> {
    match self {
      Demand::Unlimited => None,
      Demand::Max(n) => Some(*n),
    }
  }

  /// Consume a single unit of demand.
  ///
  /// Returns `false` (and leaves the demand untouched) when there is nothing
  /// left to consume.
  #[inline]
  pub fn take_one(&mut self) -> bool {
    match self {
      Demand::Unlimited => true,
      Demand::Max(0) => false,
      Demand::Max(n) => {
        *n -= 1;
        true
      }
    }
  }
}

impl Default for Demand {
  #[inline]
  fn default() -> Self { Demand::NONE }
}

impl From<usize> for Demand {
  #[inline]
  fn from(count: usize) -> Self { Demand::Max(count) }
}

impl Add for Demand {
  type Output = Demand;

  fn add(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Max(a), Demand::Max(b)) => a.checked_add(b).map_or(Demand::Unlimited, Demand::Max),
      _ => Demand::Unlimited,
    }
  }
}

impl Add<usize> for Demand {
  type Output = Demand;

  #[inline]
  fn add(self, rhs: usize) -> Demand { self + Demand::Max(rhs) }
}

impl Sub for Demand {
  type Output = Demand;

  fn sub(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Unlimited, _) => Demand::Unlimited,
      (Demand::Max(_), Demand::Unlimited) => Demand::NONE,
      (Demand::Max(a), Demand::Max(b)) => Demand::Max(a.saturating_sub(b)),
    }
  }
}

impl Sub<usize> for Demand {
  type Output = Demand;

  #[inline]
  fn sub(self, rhs: usize) -> Demand { self - Demand::Max(rhs) }
}

impl AddAssign for Demand {
  #[inline]
  fn add_assign(&mut self, rhs: Demand) { *self = *self + rhs; }
}

impl AddAssign<usize> for Demand {
  #[inline]
  fn add_assign(&mut self, rhs: usize) { *self = *self + rhs; }
}

impl SubAssign for Demand {
  #[inline]
  fn sub_assign(&mut self, rhs: Demand) { *self = *self - rhs; }
}

impl SubAssign<usize> for Demand {
  #[inline]
  fn sub_assign(&mut self, rhs: usize) { *self = *self - rhs; }
}

impl Ord for Demand {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Demand::Unlimited, Demand::Unlimited) => Ordering::Equal,
      (Demand::Unlimited, Demand::Max(_)) => Ordering::Greater,
      (Demand::Max(_), Demand::Unlimited) => Ordering::Less,
      (Demand::Max(a), Demand::Max(b)) => a.cmp(b),
    }
  }
}

impl PartialOrd for Demand {
  #[inline]
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq<usize> for Demand {
  #[inline]
  fn eq(&self, other: &usize) -> bool { *self == Demand::Max(*other) }
}

impl PartialOrd<usize> for Demand {
  #[inline]
  fn partial_cmp(&self, other: &usize) -> Option<Ordering> {
    Some(self.cmp(&Demand::Max(*other)))
  }
}

impl fmt::Display for Demand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Demand::Unlimited => f.write_str("unlimited"),
      Demand::Max(n) => write!(f, "max({n})"),
    }
  }
}
