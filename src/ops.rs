//! Operators, exposed as provided methods of [`PublisherExt`].
//!
//! Every operator is a publisher wrapping its source. Operators that only
//! transform values hand the upstream subscription straight to the
//! downstream; operators with state of their own (combinators, timing,
//! recovery) put a node between the two that owns that state.

use std::{marker::PhantomData, sync::Arc};

use crate::{
  codec::{Decoder, Encoder},
  demand::Demand,
  error::{CodecError, TimeoutError},
  publisher::{just, BoxedPublisher, Just, Publisher},
  scheduler::{Duration, Scheduler},
  subscriber::Completion,
  subscription::Cancellable,
};

pub mod catch;
pub mod coding;
pub mod combine_latest;
pub mod debounce;
pub mod delay;
pub mod distinct_until_changed;
pub mod filter;
pub mod filter_map;
pub mod flat_map;
pub mod into_stream;
pub mod lifecycle;
pub mod map;
pub mod map_err;
pub mod merge;
pub mod receive_on;
pub mod reduce;
pub mod scan;
pub mod sink;
pub mod skip;
pub mod subscribe_on;
pub mod take;
pub mod throttle;
pub mod timeout;
pub mod try_map;
pub mod zip;

pub use catch::{Catch, ReplaceError};
pub use coding::{Decode, Encode};
pub use combine_latest::CombineLatest;
pub use debounce::Debounce;
pub use delay::Delay;
pub use distinct_until_changed::DistinctUntilChanged;
pub use filter::Filter;
pub use filter_map::FilterMap;
pub use flat_map::FlatMap;
pub use into_stream::PublisherStream;
pub use lifecycle::{EventHooks, HandleEvents};
pub use map::Map;
pub use map_err::{MapErr, SetFailureType};
pub use merge::{merge_all, Merge, MergeAll};
pub use receive_on::ReceiveOn;
pub use reduce::{Collect, Count, Reduce};
pub use scan::Scan;
pub use sink::Sink;
pub use skip::Skip;
pub use subscribe_on::SubscribeOn;
pub use take::Take;
pub use throttle::{Throttle, ThrottleEdge};
pub use timeout::Timeout;
pub use try_map::{TryFilter, TryMap};
pub use zip::{Zip, ZipBuffer};

type Flatten3<X, Y, Z> = fn(((X, Y), Z)) -> (X, Y, Z);

fn flatten3<X, Y, Z>(((x, y), z): ((X, Y), Z)) -> (X, Y, Z) { (x, y, z) }

pub type Zip3<A, B, C> = Map<
  Zip<Zip<A, B>, C>,
  Flatten3<<A as Publisher>::Output, <B as Publisher>::Output, <C as Publisher>::Output>,
>;

pub type CombineLatest3<A, B, C> = Map<
  CombineLatest<CombineLatest<A, B>, C>,
  Flatten3<<A as Publisher>::Output, <B as Publisher>::Output, <C as Publisher>::Output>,
>;

pub trait PublisherExt: Publisher + Sized {
  // ==================== transform ====================

  /// Creates a new stream which calls a closure on each value and uses its
  /// return as the value.
  fn map<B, F>(self, func: F) -> Map<Self, F>
  where
    F: FnMut(Self::Output) -> B + Send + 'static,
    B: Send + 'static,
  {
    Map { source: self, func }
  }

  /// Keeps the values `predicate` accepts.
  ///
  /// ```
  /// use rxflow::prelude::*;
  ///
  /// let even = MutArc::own(vec![]);
  /// let sink = even.clone();
  /// from_iter(0..10).filter(|v| v % 2 == 0).sink_value(move |v| sink.lock().push(v));
  /// assert_eq!(*even.lock(), vec![0, 2, 4, 6, 8]);
  /// ```
  fn filter<F>(self, predicate: F) -> Filter<Self, F>
  where
    F: FnMut(&Self::Output) -> bool + Send + 'static,
  {
    Filter { source: self, predicate }
  }

  /// Maps and filters in one step: `None` drops the value.
  fn filter_map<B, F>(self, func: F) -> FilterMap<Self, F>
  where
    F: FnMut(Self::Output) -> Option<B> + Send + 'static,
    B: Send + 'static,
  {
    FilterMap { source: self, func }
  }

  /// Emits every intermediate accumulator, starting from `seed`.
  fn scan<B, F>(self, seed: B, func: F) -> Scan<Self, F, B>
  where
    F: FnMut(B, Self::Output) -> B + Send + 'static,
    B: Clone + Send + 'static,
  {
    Scan { source: self, func, seed }
  }

  /// Folds the whole stream into one value, emitted when the upstream
  /// finishes. An empty upstream yields `seed`.
  fn reduce<B, F>(self, seed: B, func: F) -> Reduce<Self, F, B>
  where
    F: FnMut(B, Self::Output) -> B + Send + 'static,
    B: Send + 'static,
  {
    Reduce { source: self, func, seed }
  }

  fn collect(self) -> Collect<Self, Self::Output> {
    let func = reduce::push_item as fn(Vec<Self::Output>, Self::Output) -> Vec<Self::Output>;
    Reduce { source: self, func, seed: Vec::new() }
  }

  fn count(self) -> Count<Self, Self::Output> {
    let func = reduce::count_item as fn(usize, Self::Output) -> usize;
    Reduce { source: self, func, seed: 0 }
  }

  /// Maps every value to a publisher and merges the results.
  fn flat_map<Q, F>(self, func: F) -> FlatMap<Self, F>
  where
    F: FnMut(Self::Output) -> Q + Send + 'static,
    Q: Publisher<Failure = Self::Failure>,
  {
    self.flat_map_with(Demand::Unlimited, func)
  }

  /// `flat_map` with at most `max_concurrent` inner publishers alive at once.
  /// Upstream values are requested only as inner slots free up.
  fn flat_map_with<Q, F>(self, max_concurrent: Demand, func: F) -> FlatMap<Self, F>
  where
    F: FnMut(Self::Output) -> Q + Send + 'static,
    Q: Publisher<Failure = Self::Failure>,
  {
    FlatMap { source: self, func, max_concurrent }
  }

  fn try_map<B, F>(self, func: F) -> TryMap<Self, F>
  where
    F: FnMut(Self::Output) -> Result<B, Self::Failure> + Send + 'static,
    B: Send + 'static,
  {
    TryMap { source: self, func }
  }

  fn try_filter<F>(self, predicate: F) -> TryFilter<Self, F>
  where
    F: FnMut(&Self::Output) -> Result<bool, Self::Failure> + Send + 'static,
  {
    TryFilter { source: self, predicate }
  }

  fn map_err<E, F>(self, func: F) -> MapErr<Self, F>
  where
    F: FnOnce(Self::Failure) -> E + Send + 'static,
    E: Send + 'static,
  {
    MapErr { source: self, func }
  }

  /// Gives a chain that cannot fail a concrete failure type, so it can be
  /// combined with chains that can.
  fn set_failure_type<E>(self) -> SetFailureType<Self, E>
  where
    Self: Publisher<Failure = std::convert::Infallible>,
    E: Send + 'static,
  {
    SetFailureType { source: self, _failure: PhantomData }
  }

  // ==================== filter ====================

  /// Emits the first `count` values, then cancels the upstream and
  /// finishes.
  fn take(self, count: usize) -> Take<Self> { Take { source: self, count } }

  fn skip(self, count: usize) -> Skip<Self> { Skip { source: self, count } }

  /// Drops values equal to the one emitted just before.
  fn distinct_until_changed(self) -> DistinctUntilChanged<Self>
  where
    Self::Output: PartialEq + Clone,
  {
    DistinctUntilChanged { source: self }
  }

  // ==================== combine ====================

  /// Pairs values by position. See [`ZipBuffer`] for the buffering policy;
  /// this is `Unbounded`.
  fn zip<B>(self, other: B) -> Zip<Self, B>
  where
    B: Publisher<Failure = Self::Failure>,
  {
    self.zip_with_buffer(other, ZipBuffer::Unbounded)
  }

  fn zip_with_buffer<B>(self, other: B, buffer: ZipBuffer) -> Zip<Self, B>
  where
    B: Publisher<Failure = Self::Failure>,
  {
    Zip { a: self, b: other, buffer }
  }

  fn zip3<B, C>(self, b: B, c: C) -> Zip3<Self, B, C>
  where
    B: Publisher<Failure = Self::Failure>,
    C: Publisher<Failure = Self::Failure>,
  {
    self.zip(b).zip(c).map(flatten3 as Flatten3<_, _, _>)
  }

  fn merge<B>(self, other: B) -> Merge<Self, B>
  where
    B: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Merge { a: self, b: other }
  }

  /// Emits the latest value of both inputs whenever either produces, once
  /// both have produced at least once.
  ///
  /// ```
  /// use rxflow::prelude::*;
  ///
  /// let (a, b) = (PublishSubject::<i32>::new(), PublishSubject::<&str>::new());
  /// let seen = MutArc::own(vec![]);
  /// let sink = seen.clone();
  /// let _guard = a
  ///   .clone()
  ///   .combine_latest(b.clone())
  ///   .sink_value(move |pair| sink.lock().push(pair))
  ///   .cancel_when_dropped();
  ///
  /// a.send(1);
  /// b.send("x");
  /// a.send(2);
  /// assert_eq!(*seen.lock(), vec![(1, "x"), (2, "x")]);
  /// ```
  fn combine_latest<B>(self, other: B) -> CombineLatest<Self, B>
  where
    Self::Output: Clone,
    B: Publisher<Failure = Self::Failure>,
    B::Output: Clone,
  {
    CombineLatest { a: self, b: other }
  }

  fn combine_latest3<B, C>(self, b: B, c: C) -> CombineLatest3<Self, B, C>
  where
    Self::Output: Clone,
    B: Publisher<Failure = Self::Failure>,
    B::Output: Clone,
    C: Publisher<Failure = Self::Failure>,
    C::Output: Clone,
  {
    self.combine_latest(b).combine_latest(c).map(flatten3 as Flatten3<_, _, _>)
  }

  // ==================== time ====================

  fn delay<Sch: Scheduler>(self, delay: Duration, scheduler: Sch) -> Delay<Self, Sch> {
    Delay { source: self, delay, scheduler }
  }

  /// Emits a value once `quiet` has passed without a newer one.
  fn debounce<Sch: Scheduler>(self, quiet: Duration, scheduler: Sch) -> Debounce<Self, Sch> {
    Debounce { source: self, quiet, scheduler }
  }

  /// One value per `window`: the latest one if `emit_latest`, else the
  /// first.
  fn throttle<Sch: Scheduler>(self, window: Duration, scheduler: Sch, emit_latest: bool) -> Throttle<Self, Sch> {
    let edge = if emit_latest { ThrottleEdge::Latest } else { ThrottleEdge::First };
    self.throttle_edge(window, scheduler, edge)
  }

  fn throttle_edge<Sch: Scheduler>(self, window: Duration, scheduler: Sch, edge: ThrottleEdge) -> Throttle<Self, Sch> {
    Throttle { source: self, window, scheduler, edge }
  }

  /// Fails with [`TimeoutError`] if nothing arrives within `after`.
  fn timeout<Sch: Scheduler>(
    self,
    after: Duration,
    scheduler: Sch,
  ) -> Timeout<Self, Sch, fn(Duration) -> Self::Failure>
  where
    Self::Failure: From<TimeoutError>,
  {
    let error = timeout::timeout_error::<Self::Failure> as fn(Duration) -> Self::Failure;
    self.timeout_with(after, scheduler, error)
  }

  /// `timeout` failing with whatever `error` builds from the elapsed
  /// duration.
  fn timeout_with<Sch, F>(self, after: Duration, scheduler: Sch, error: F) -> Timeout<Self, Sch, F>
  where
    Sch: Scheduler,
    F: Fn(Duration) -> Self::Failure + Send + Sync + 'static,
  {
    Timeout { source: self, after, scheduler, error }
  }

  // ==================== scheduling ====================

  fn receive_on<Sch: Scheduler>(self, scheduler: Sch) -> ReceiveOn<Self, Sch> {
    ReceiveOn { source: self, scheduler }
  }

  fn subscribe_on<Sch: Scheduler>(self, scheduler: Sch) -> SubscribeOn<Self, Sch>
  where
    Self: Send + 'static,
  {
    SubscribeOn { source: self, scheduler }
  }

  // ==================== errors & side effects ====================

  /// Replaces a failure with the publisher `handler` returns.
  fn catch<Q, F>(self, handler: F) -> Catch<Self, F>
  where
    F: FnOnce(Self::Failure) -> Q + Send + 'static,
    Q: Publisher<Output = Self::Output>,
  {
    Catch { source: self, handler }
  }

  /// Replaces a failure with `value`, then finishes.
  fn replace_error(self, value: Self::Output) -> ReplaceError<Self, Self::Output, Self::Failure> {
    let handler: Box<dyn FnOnce(Self::Failure) -> Just<Self::Output> + Send> = Box::new(move |_| just(value));
    Catch { source: self, handler }
  }

  fn handle_events(self, hooks: EventHooks<Self::Output, Self::Failure>) -> HandleEvents<Self> {
    HandleEvents { source: self, hooks: Arc::new(hooks) }
  }

  /// Logs every event at `info` under the `rxflow::print` target.
  fn print(self, prefix: &str) -> HandleEvents<Self>
  where
    Self::Output: std::fmt::Debug,
    Self::Failure: std::fmt::Debug,
  {
    self.handle_events(lifecycle::print_hooks(prefix))
  }

  // ==================== codec ====================

  fn encode<C>(self, encoder: C) -> Encode<Self, C>
  where
    C: Encoder<Self::Output>,
    Self::Failure: From<CodecError>,
  {
    Encode { source: self, encoder }
  }

  fn decode<T, C>(self, decoder: C) -> Decode<Self, C, T>
  where
    Self::Output: AsRef<[u8]>,
    Self::Failure: From<CodecError>,
    C: Decoder<T>,
    T: Send + 'static,
  {
    Decode { source: self, decoder, _output: PhantomData }
  }

  // ==================== consume ====================

  /// Subscribes with closures and unlimited demand.
  fn sink<FV, FC>(self, on_value: FV, on_completion: FC) -> Cancellable
  where
    FV: FnMut(Self::Output) + Send + 'static,
    FC: FnOnce(Completion<Self::Failure>) + Send + 'static,
  {
    let (sink, handle) = Sink::new(on_value, on_completion);
    self.subscribe(sink);
    handle
  }

  fn sink_value<FV>(self, on_value: FV) -> Cancellable
  where
    FV: FnMut(Self::Output) + Send + 'static,
  {
    self.sink(on_value, |_| {})
  }

  /// Consumes the chain as a `futures::Stream` of `Result`s.
  fn into_stream(self) -> PublisherStream<Self::Output, Self::Failure> {
    let (stream, subscriber) = PublisherStream::channel();
    self.subscribe(subscriber);
    stream
  }

  /// Erases the chain's type, for API boundaries.
  fn boxed(self) -> BoxedPublisher<Self::Output, Self::Failure>
  where
    Self: Send + 'static,
  {
    BoxedPublisher::new(self)
  }
}

impl<P: Publisher> PublisherExt for P {}
