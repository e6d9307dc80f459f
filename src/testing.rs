//! Test tooling: a recording subscriber that enforces the protocol.
//!
//! [`TestSubscriber`] panics on any protocol violation it can observe: a value
//! delivered without outstanding demand, anything delivered after completion,
//! or a second subscription. The paired [`Recorder`] lets a test inspect what
//! arrived and drive demand and cancellation by hand.

use crate::{
  demand::Demand,
  rc::MutArc,
  subscriber::{Completion, Subscriber},
  subscription::SubscriptionRef,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T, E> {
  Subscribed,
  Value(T),
  Completion(Completion<E>),
}

pub struct TestSubscriber<T, E> {
  recorder: Recorder<T, E>,
  initial: Demand,
  per_value: Demand,
}

pub struct Recorder<T, E> {
  inner: MutArc<RecorderState<T, E>>,
}

struct RecorderState<T, E> {
  events: Vec<Event<T, E>>,
  subscription: Option<SubscriptionRef>,
  outstanding: Demand,
  subscribed: bool,
  completed: bool,
}

impl<T, E> Clone for Recorder<T, E> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T, E> TestSubscriber<T, E> {
  /// Requests `initial` on subscription and nothing afterwards.
  pub fn new(initial: Demand) -> (Self, Recorder<T, E>) {
    Self::with_demand(initial, Demand::NONE)
  }

  pub fn unlimited() -> (Self, Recorder<T, E>) { Self::new(Demand::Unlimited) }

  /// Requests `initial` on subscription and returns `per_value` from every
  /// `receive`.
  pub fn with_demand(initial: Demand, per_value: Demand) -> (Self, Recorder<T, E>) {
    let recorder = Recorder {
      inner: MutArc::own(RecorderState {
        events: vec![],
        subscription: None,
        outstanding: Demand::NONE,
        subscribed: false,
        completed: false,
      }),
    };
    (Self { recorder: recorder.clone(), initial, per_value }, recorder)
  }
}

impl<T, E> Subscriber<T, E> for TestSubscriber<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) {
    {
      let mut state = self.recorder.inner.lock();
      assert!(!state.subscribed, "subscriber received a second subscription");
      assert!(!state.completed, "subscription received after completion");
      state.subscribed = true;
      state.subscription = Some(subscription.clone());
      state.outstanding += self.initial;
      state.events.push(Event::Subscribed);
    }
    if !self.initial.is_none() {
      subscription.request(self.initial);
    }
  }

  fn receive(&mut self, input: T) -> Demand {
    let mut state = self.recorder.inner.lock();
    assert!(state.subscribed, "value received before the subscription");
    assert!(!state.completed, "value received after completion");
    assert!(state.outstanding.take_one(), "value delivered without outstanding demand");
    state.events.push(Event::Value(input));
    state.outstanding += self.per_value;
    self.per_value
  }

  fn receive_completion(self, completion: Completion<E>) {
    let mut state = self.recorder.inner.lock();
    assert!(!state.completed, "completion delivered twice");
    state.completed = true;
    state.subscription = None;
    state.events.push(Event::Completion(completion));
  }
}

impl<T, E> Recorder<T, E> {
  /// Grant more demand through the recorded subscription.
  pub fn request(&self, demand: Demand) {
    let subscription = {
      let mut state = self.inner.lock();
      state.outstanding += demand;
      state.subscription.clone()
    };
    if let Some(subscription) = subscription {
      subscription.request(demand);
    }
  }

  pub fn cancel(&self) {
    let subscription = self.inner.lock().subscription.take();
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }

  pub fn is_subscribed(&self) -> bool { self.inner.lock().subscribed }

  pub fn is_completed(&self) -> bool { self.inner.lock().completed }

  pub fn is_finished(&self) -> bool {
    self
      .inner
      .lock()
      .events
      .iter()
      .any(|event| matches!(event, Event::Completion(Completion::Finished)))
  }

  pub fn value_count(&self) -> usize {
    self.inner.lock().events.iter().filter(|event| matches!(event, Event::Value(_))).count()
  }

  /// Demand granted but not yet used up.
  pub fn outstanding(&self) -> Demand { self.inner.lock().outstanding }
}

impl<T: Clone, E: Clone> Recorder<T, E> {
  pub fn events(&self) -> Vec<Event<T, E>> { self.inner.lock().events.clone() }

  pub fn values(&self) -> Vec<T> {
    self
      .inner
      .lock()
      .events
      .iter()
      .filter_map(|event| match event {
        Event::Value(value) => Some(value.clone()),
        _ => None,
      })
      .collect()
  }

  pub fn completion(&self) -> Option<Completion<E>> {
    self.inner.lock().events.iter().find_map(|event| match event {
      Event::Completion(completion) => Some(completion.clone()),
      _ => None,
    })
  }

  pub fn failure(&self) -> Option<E> {
    match self.completion() {
      Some(Completion::Failed(err)) => Some(err),
      _ => None,
    }
  }
}
