use smallvec::{smallvec, SmallVec};

use crate::demand::Demand;

/// Downstream demand shared out among several upstreams.
///
/// Demand from the downstream goes into an unpromised budget. `distribute`
/// hands a finite budget out unit by unit, round-robin over the lanes, so the
/// lanes together are never asked for more than the downstream asked for.
/// An unlimited budget is passed to every lane as is. A lane that leaves
/// gives back whatever it still owed.
pub(crate) struct DemandPool<L> {
  budget: Demand,
  lanes: SmallVec<[Lane<L>; 2]>,
  next_key: usize,
  cursor: usize,
}

struct Lane<L> {
  key: usize,
  target: L,
  promised: Demand,
}

pub(crate) type Grants<L> = SmallVec<[(usize, L, Demand); 2]>;

impl<L: Clone> DemandPool<L> {
  pub(crate) fn new() -> Self {
    Self { budget: Demand::NONE, lanes: SmallVec::new(), next_key: 0, cursor: 0 }
  }

  /// Add a lane; it takes part in the next `distribute`.
  pub(crate) fn add(&mut self, target: L) -> usize {
    let key = self.next_key;
    self.next_key += 1;
    self.lanes.push(Lane { key, target, promised: Demand::NONE });
    key
  }

  /// Remove a lane, returning what it still owed to the budget.
  pub(crate) fn remove(&mut self, key: usize) -> Option<L> {
    let pos = self.lanes.iter().position(|lane| lane.key == key)?;
    let lane = self.lanes.remove(pos);
    self.budget += lane.promised;
    if self.cursor > pos {
      self.cursor -= 1;
    }
    if self.cursor >= self.lanes.len() {
      self.cursor = 0;
    }
    Some(lane.target)
  }

  pub(crate) fn deposit(&mut self, demand: Demand) { self.budget += demand; }

  /// Lane `key` delivered one value.
  pub(crate) fn delivered(&mut self, key: usize) {
    if let Some(lane) = self.lanes.iter_mut().find(|lane| lane.key == key) {
      lane.promised.take_one();
    }
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.lanes.is_empty() }

  /// Remove every lane, oldest first.
  pub(crate) fn drain(&mut self) -> impl Iterator<Item = L> + '_ {
    self.cursor = 0;
    self.lanes.drain(..).map(|lane| lane.target)
  }

  /// Promise the budget to the lanes. The returned grants are to be
  /// requested from the lanes' upstreams, in order, without any lock held.
  pub(crate) fn distribute(&mut self) -> Grants<L> {
    let mut grants = Grants::new();
    let len = self.lanes.len();
    if len == 0 || self.budget.is_none() {
      return grants;
    }
    match self.budget {
      Demand::Unlimited => {
        for lane in self.lanes.iter_mut().filter(|lane| !lane.promised.is_unlimited()) {
          lane.promised = Demand::Unlimited;
          grants.push((lane.key, lane.target.clone(), Demand::Unlimited));
        }
      }
      Demand::Max(units) => {
        let mut shares: SmallVec<[usize; 2]> = smallvec![units / len; len];
        for offset in 0..units % len {
          shares[(self.cursor + offset) % len] += 1;
        }
        self.cursor = (self.cursor + units % len) % len;
        self.budget = Demand::NONE;
        for (lane, share) in self.lanes.iter_mut().zip(shares) {
          if share > 0 {
            lane.promised += share;
            grants.push((lane.key, lane.target.clone(), Demand::max(share)));
          }
        }
      }
    }
    grants
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn shares(grants: Grants<char>) -> Vec<(char, Demand)> {
    grants.into_iter().map(|(_, target, demand)| (target, demand)).collect()
  }

  #[test]
  fn finite_budget_is_split_round_robin() {
    let mut pool = DemandPool::new();
    pool.add('a');
    pool.add('b');
    pool.deposit(Demand::max(3));
    assert_eq!(shares(pool.distribute()), vec![('a', Demand::max(2)), ('b', Demand::max(1))]);
    pool.deposit(Demand::max(1));
    assert_eq!(shares(pool.distribute()), vec![('b', Demand::max(1))]);
    assert!(pool.distribute().is_empty());
  }

  #[test]
  fn budget_waits_for_a_lane() {
    let mut pool = DemandPool::new();
    pool.deposit(Demand::max(2));
    assert!(pool.distribute().is_empty());
    pool.add('a');
    assert_eq!(shares(pool.distribute()), vec![('a', Demand::max(2))]);
  }

  #[test]
  fn leaving_lane_returns_its_promise() {
    let mut pool = DemandPool::new();
    let a = pool.add('a');
    pool.add('b');
    pool.deposit(Demand::max(4));
    pool.distribute();
    pool.delivered(a);
    assert_eq!(pool.remove(a), Some('a'));
    assert_eq!(shares(pool.distribute()), vec![('b', Demand::max(1))]);
  }

  #[test]
  fn unlimited_goes_to_every_lane_once() {
    let mut pool = DemandPool::new();
    pool.add('a');
    pool.deposit(Demand::Unlimited);
    assert_eq!(shares(pool.distribute()), vec![('a', Demand::Unlimited)]);
    pool.add('b');
    assert_eq!(shares(pool.distribute()), vec![('b', Demand::Unlimited)]);
    assert!(pool.distribute().is_empty());
  }
}
