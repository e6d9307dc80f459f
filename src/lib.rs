//! # rxflow: demand-driven reactive streams
//!
//! A [`Publisher`](publisher::Publisher) describes a stream of values that
//! ends in at most one completion, `Finished` or `Failed`. A
//! [`Subscriber`](subscriber::Subscriber) consumes it and controls the flow
//! with [`Demand`](demand::Demand): nothing is delivered that has not been
//! asked for. Operators compose publishers; subjects let values be pushed in
//! by hand; schedulers decide when deferred work runs.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxflow::prelude::*;
//!
//! let out = MutArc::own(vec![]);
//! let sink = out.clone();
//! from_iter(1..=10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .take(3)
//!   .sink_value(move |v| sink.lock().push(v));
//! assert_eq!(*out.lock(), vec![20, 40, 60]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Publisher`] | Produces values, honoring demand |
//! | [`Subscriber`] | Consumes values, issues demand |
//! | [`Subscription`] | The live control channel: `request` and `cancel` |
//! | [`PublisherExt`] | Every operator, as a method |
//! | [`Scheduler`] | Where and when timing operators run their work |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): `ThreadPoolScheduler`
//! - **`tokio-scheduler`**: `TokioScheduler`
//! - **`json`**: `JsonCodec` for the `encode` / `decode` operators
//!
//! [`Publisher`]: publisher::Publisher
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`PublisherExt`]: ops::PublisherExt
//! [`Scheduler`]: scheduler::Scheduler

pub mod codec;
pub mod demand;
pub mod error;
pub mod ops;
pub(crate) mod outlet;
pub mod prelude;
pub mod publisher;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod testing;

pub use prelude::*;
