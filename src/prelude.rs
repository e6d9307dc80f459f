//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

pub use std::convert::Infallible;

#[cfg(feature = "json")]
pub use crate::codec::JsonCodec;
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::{
  codec::{Decoder, Encoder},
  demand::Demand,
  error::{CodecError, TimeoutError},
  ops::{merge_all, EventHooks, PublisherExt, PublisherStream, ThrottleEdge, ZipBuffer},
  publisher::{
    defer, empty, fail, from_iter, interval, just, never, BoxedPublisher, Just, Publisher, Record,
  },
  rc::MutArc,
  scheduler::{Duration, ImmediateScheduler, Scheduler, TaskHandle, TestScheduler},
  subject::{BehaviorSubject, PublishSubject},
  subscriber::{BoxedSubscriber, Completion, Subscriber},
  subscription::{Cancellable, EmptySubscription, Subscription, SubscriptionGuard, SubscriptionRef},
};
