//! The producer side of the protocol and the built-in sources.
//!
//! A [`Publisher`] is an immutable description of a stream. Subscribing
//! consumes it; derive or implement `Clone` to subscribe more than once.
//! Operators wrap publishers, they never mutate them.

use crate::subscriber::{BoxedSubscriber, Subscriber};

mod deferred;
mod interval;
mod never;
mod sequence;

pub use deferred::{defer, Deferred};
pub use interval::{interval, Interval};
pub use never::{never, Never};
pub use sequence::{empty, fail, from_iter, just, Empty, Fail, Just, Record, Sequence};

pub trait Publisher {
  type Output: Send + 'static;
  type Failure: Send + 'static;

  /// Attach `subscriber`. The publisher hands it a subscription before
  /// returning; it may also deliver values synchronously if demand is granted
  /// during that call.
  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Self::Output, Self::Failure>;
}

/// Object-safe mirror of [`Publisher`].
pub trait DynPublisher<Output, Failure> {
  fn box_subscribe(self: Box<Self>, subscriber: BoxedSubscriber<Output, Failure>);
}

impl<P> DynPublisher<P::Output, P::Failure> for P
where
  P: Publisher,
{
  #[inline]
  fn box_subscribe(self: Box<Self>, subscriber: BoxedSubscriber<P::Output, P::Failure>) {
    (*self).subscribe(subscriber)
  }
}

/// A publisher with its concrete operator chain erased.
///
/// Meant for API boundaries (struct fields, return types of public
/// functions). Chains are built with concrete types everywhere else.
pub struct BoxedPublisher<Output, Failure>(Box<dyn DynPublisher<Output, Failure> + Send>);

impl<Output, Failure> BoxedPublisher<Output, Failure> {
  pub fn new<P>(publisher: P) -> Self
  where
    P: Publisher<Output = Output, Failure = Failure> + Send + 'static,
  {
    BoxedPublisher(Box::new(publisher))
  }
}

impl<Output, Failure> Publisher for BoxedPublisher<Output, Failure>
where
  Output: Send + 'static,
  Failure: Send + 'static,
{
  type Output = Output;
  type Failure = Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Output, Failure>,
  {
    self.0.box_subscribe(Box::new(subscriber))
  }
}
