use super::Publisher;
use crate::subscriber::Subscriber;

/// Builds the real publisher only when a subscriber arrives.
#[derive(Clone)]
pub struct Deferred<F> {
  factory: F,
}

pub fn defer<F, P>(factory: F) -> Deferred<F>
where
  F: FnOnce() -> P,
  P: Publisher,
{
  Deferred { factory }
}

impl<F, P> Publisher for Deferred<F>
where
  F: FnOnce() -> P,
  P: Publisher,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    (self.factory)().subscribe(subscriber)
  }
}
