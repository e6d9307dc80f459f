use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  error::TimeoutError,
  outlet::Outlet,
  publisher::Publisher,
  scheduler::{Duration, Scheduler, TaskHandle},
  subscriber::{Completion, Subscriber},
  subscription::{Subscription, SubscriptionRef, Upstream},
};

/// Fails with `error(after)` and cancels the upstream if nothing arrives
/// within `after` of subscribing or of the previous value.
#[derive(Clone)]
pub struct Timeout<P, Sch, F> {
  pub(crate) source: P,
  pub(crate) after: Duration,
  pub(crate) scheduler: Sch,
  pub(crate) error: F,
}

pub(crate) fn timeout_error<E: From<TimeoutError>>(after: Duration) -> E { TimeoutError { after }.into() }

impl<P, Sch, F> Publisher for Timeout<P, Sch, F>
where
  P: Publisher,
  Sch: Scheduler,
  F: Fn(Duration) -> P::Failure + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure>,
  {
    let node = Arc::new(TimeoutNode {
      outlet: Outlet::new(subscriber),
      upstream: Upstream::new(),
      after: self.after,
      scheduler: self.scheduler,
      error: self.error,
      state: Mutex::new(TimerState { generation: 0, timer: None, terminated: false }),
    });
    node.outlet.attach(node.clone());
    if node.outlet.is_closed() {
      return;
    }
    node.restart();
    self.source.subscribe(TimeoutSubscriber(node));
  }
}

struct TimeoutNode<T, E, S, Sch, F> {
  outlet: Outlet<T, E, S>,
  upstream: Upstream,
  after: Duration,
  scheduler: Sch,
  error: F,
  state: Mutex<TimerState>,
}

struct TimerState {
  generation: u64,
  timer: Option<TaskHandle>,
  terminated: bool,
}

impl<T, E, S, Sch, F> TimeoutNode<T, E, S, Sch, F>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
  F: Fn(Duration) -> E + Send + Sync + 'static,
{
  fn restart(self: &Arc<Self>) {
    let (generation, previous) = {
      let mut state = self.state.lock();
      if state.terminated {
        return;
      }
      state.generation += 1;
      (state.generation, state.timer.take())
    };
    if let Some(previous) = previous {
      previous.cancel();
    }

    let weak: Weak<Self> = Arc::downgrade(self);
    let timer = self.scheduler.schedule_after(self.after, move || {
      if let Some(node) = weak.upgrade() {
        node.expire(generation);
      }
    });
    let mut state = self.state.lock();
    if state.generation == generation && !state.terminated && !timer.is_closed() {
      state.timer = Some(timer);
    }
  }

  fn expire(&self, generation: u64) {
    {
      let mut state = self.state.lock();
      if state.generation != generation || state.terminated {
        return;
      }
      state.terminated = true;
      state.timer = None;
    }
    tracing::debug!(after = ?self.after, "timed out, cancelling upstream");
    self.upstream.cancel();
    self.outlet.complete(Completion::Failed((self.error)(self.after)));
  }

  /// Returns false if the timeout already fired.
  fn stop(&self) -> bool {
    let timer = {
      let mut state = self.state.lock();
      if state.terminated {
        return false;
      }
      state.terminated = true;
      state.timer.take()
    };
    if let Some(timer) = timer {
      timer.cancel();
    }
    true
  }
}

impl<T, E, S, Sch, F> Subscription for TimeoutNode<T, E, S, Sch, F>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
  F: Fn(Duration) -> E + Send + Sync + 'static,
{
  fn request(&self, demand: Demand) {
    let extra = self.outlet.request(demand);
    self.upstream.request(demand + extra);
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.upstream.cancel();
    self.stop();
  }
}

struct TimeoutSubscriber<T, E, S, Sch, F>(Arc<TimeoutNode<T, E, S, Sch, F>>);

impl<T, E, S, Sch, F> Subscriber<T, E> for TimeoutSubscriber<T, E, S, Sch, F>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E>,
  Sch: Scheduler,
  F: Fn(Duration) -> E + Send + Sync + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.0.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    if self.0.state.lock().terminated {
      return Demand::NONE;
    }
    self.0.restart();
    self.0.outlet.push(input)
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.0.upstream.release();
    if self.0.stop() {
      self.0.outlet.complete(completion);
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  #[derive(Debug, Clone, PartialEq)]
  enum FetchError {
    TimedOut(Duration),
  }

  impl From<TimeoutError> for FetchError {
    fn from(err: TimeoutError) -> Self { FetchError::TimedOut(err.after) }
  }

  #[test]
  fn fails_when_the_source_goes_quiet() {
    let scheduler = TestScheduler::new();
    let subject = PublishSubject::<i32, FetchError>::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    subject.clone().timeout(Duration::from_secs(1), scheduler.clone()).subscribe(subscriber);

    scheduler.advance_by(Duration::from_millis(800));
    subject.send(1);
    scheduler.advance_by(Duration::from_millis(800));
    subject.send(2);
    assert!(!recorder.is_completed());

    scheduler.advance_by(Duration::from_secs(1));
    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(recorder.failure(), Some(FetchError::TimedOut(Duration::from_secs(1))));
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn the_first_value_is_timed_from_subscription() {
    let scheduler = TestScheduler::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    never::<i32, TimeoutError>().timeout(Duration::from_millis(10), scheduler.clone()).subscribe(subscriber);
    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(recorder.failure(), Some(TimeoutError { after: Duration::from_millis(10) }));
  }

  #[test]
  fn completion_in_time_stops_the_timer() {
    let scheduler = TestScheduler::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter([1, 2])
      .set_failure_type::<TimeoutError>()
      .timeout(Duration::from_secs(1), scheduler.clone())
      .subscribe(subscriber);
    assert!(recorder.is_finished());
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[test]
  fn custom_error_factory() {
    let scheduler = TestScheduler::new();
    let (subscriber, recorder) = TestSubscriber::unlimited();
    never::<(), String>()
      .timeout_with(Duration::from_secs(2), scheduler.clone(), |after| format!("stalled for {}s", after.as_secs()))
      .subscribe(subscriber);
    scheduler.flush();
    assert_eq!(recorder.failure(), Some("stalled for 2s".to_string()));
  }
}
