use smallvec::SmallVec;

/// Identity-keyed collection of live entries.
///
/// Holds the attached subscribers of a subject. Ids are never reused, so a
/// stale id can never remove a newer entry.
pub struct Registry<U> {
  next_id: usize,
  entries: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for Registry<U> {
  fn default() -> Self { Self { next_id: 0, entries: SmallVec::new() } }
}

impl<U> Registry<U> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Store `entry` and return the id it was filed under.
  pub fn insert(&mut self, entry: U) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.entries.push((id, entry));
    id
  }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    let pos = self.entries.iter().position(|(key, _)| *key == id)?;
    Some(self.entries.remove(pos).1)
  }

  #[inline]
  pub fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn values(&self) -> impl Iterator<Item = &U> { self.entries.iter().map(|(_, entry)| entry) }

  /// Remove and return every entry, oldest first.
  pub fn drain(&mut self) -> impl Iterator<Item = U> + '_ {
    self.entries.drain(..).map(|(_, entry)| entry)
  }
}

impl<U: Clone> Registry<U> {
  /// Copy of the current entries, for iterating without holding a lock.
  pub fn snapshot(&self) -> SmallVec<[U; 2]> { self.values().cloned().collect() }
}
