//! Shared core of the subjects.
//!
//! Every attached subscriber gets a [`Conduit`]: its own outlet plus a
//! handle back to the hub. Sends, completions and the priming of new
//! `BehaviorSubject` subscribers are serialized through the hub's event queue:
//! whoever finds the queue idle processes it, delivering without the hub lock
//! held, and re-entrant sends from inside a subscriber are queued behind the
//! current one.

use std::{
  collections::VecDeque,
  sync::{Arc, OnceLock, Weak},
};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
  demand::Demand,
  outlet::Outlet,
  subscriber::{Completion, Subscriber},
  subscription::{EmptySubscription, Registry, Subscription, SubscriptionRef},
};

/// What a subject remembers of the values sent through it.
pub(crate) trait Memory<T>: Send + 'static {
  /// Whether new subscribers start with the remembered value.
  const PRIMES: bool;

  fn remember(&mut self, value: &T);

  fn recall(&self) -> Option<T>;
}

/// Remembers nothing.
pub(crate) struct Forget;

impl<T> Memory<T> for Forget {
  const PRIMES: bool = false;

  fn remember(&mut self, _: &T) {}

  fn recall(&self) -> Option<T> { None }
}

/// Remembers the latest value.
pub(crate) struct Latest<T>(pub(crate) T);

impl<T: Clone + Send + 'static> Memory<T> for Latest<T> {
  const PRIMES: bool = true;

  fn remember(&mut self, value: &T) { self.0 = value.clone(); }

  fn recall(&self) -> Option<T> { Some(self.0.clone()) }
}

/// The hub's view of one attached subscriber.
trait Inbox<T, E>: Send + Sync {
  fn offer(&self, value: T);

  fn complete(&self, completion: Completion<E>);

  /// Deliver the subject's value at this point of the event order, then
  /// release the demand collected so far.
  fn prime(&self, value: Option<T>);
}

enum Event<T, E> {
  Send(T),
  Complete(Completion<E>),
  Prime(Arc<dyn Inbox<T, E>>),
}

pub(crate) struct Hub<T, E, M> {
  state: Mutex<HubState<T, E, M>>,
}

struct HubState<T, E, M> {
  inboxes: Registry<Arc<dyn Inbox<T, E>>>,
  memory: M,
  completion: Option<Completion<E>>,
  // Upstreams this subject is subscribed to as a subscriber.
  sources: Vec<SubscriptionRef>,
  events: VecDeque<Event<T, E>>,
  draining: bool,
}

enum Work<T, E> {
  Send(T, SmallVec<[Arc<dyn Inbox<T, E>>; 2]>),
  Complete(Completion<E>, SmallVec<[Arc<dyn Inbox<T, E>>; 2]>, Vec<SubscriptionRef>),
  Prime(Arc<dyn Inbox<T, E>>, Option<T>),
  Skip,
}

impl<T, E, M> Hub<T, E, M>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
  M: Memory<T>,
{
  pub(crate) fn new(memory: M) -> Self {
    Self {
      state: Mutex::new(HubState {
        inboxes: Registry::new(),
        memory,
        completion: None,
        sources: Vec::new(),
        events: VecDeque::new(),
        draining: false,
      }),
    }
  }

  pub(crate) fn send(&self, value: T) { self.post(Event::Send(value)) }

  pub(crate) fn send_completion(&self, completion: Completion<E>) { self.post(Event::Complete(completion)) }

  pub(crate) fn subscriber_count(&self) -> usize { self.state.lock().inboxes.len() }

  pub(crate) fn recall(&self) -> Option<T> { self.state.lock().memory.recall() }

  pub(crate) fn attach<S>(self: &Arc<Self>, mut subscriber: S)
  where
    S: Subscriber<T, E>,
  {
    let finished = self.state.lock().completion.clone();
    if let Some(completion) = finished {
      subscriber.receive_subscription(EmptySubscription::shared());
      subscriber.receive_completion(completion);
      return;
    }

    let conduit = Arc::new_cyclic(|me| Conduit {
      me: me.clone(),
      outlet: Outlet::new(subscriber),
      hub: Arc::downgrade(self),
      id: OnceLock::new(),
      unprimed: Mutex::new(M::PRIMES.then_some(Demand::NONE)),
    });
    // The subject may have completed since the check above.
    let raced = {
      let mut state = self.state.lock();
      match &state.completion {
        Some(completion) => Some(completion.clone()),
        None => {
          let id = state.inboxes.insert(conduit.clone());
          let _ = conduit.id.set(id);
          None
        }
      }
    };
    conduit.outlet.attach(conduit.clone());
    match raced {
      Some(completion) => conduit.outlet.complete(completion),
      None => tracing::trace!("subject subscriber attached"),
    }
  }

  pub(crate) fn add_source(&self, subscription: SubscriptionRef) {
    let closed = {
      let mut state = self.state.lock();
      if state.completion.is_none() {
        state.sources.push(subscription.clone());
      }
      state.completion.is_some()
    };
    if closed {
      subscription.cancel();
    } else {
      subscription.request(Demand::Unlimited);
    }
  }

  fn detach(&self, id: usize) {
    if self.state.lock().inboxes.remove(id).is_some() {
      tracing::trace!("subject subscriber detached");
    }
  }

  fn post(&self, event: Event<T, E>) {
    {
      let mut state = self.state.lock();
      state.events.push_back(event);
      if std::mem::replace(&mut state.draining, true) {
        return;
      }
    }
    self.drain();
  }

  fn drain(&self) {
    loop {
      let work = {
        let mut state = self.state.lock();
        let Some(event) = state.events.pop_front() else {
          state.draining = false;
          return;
        };
        match event {
          Event::Send(_) | Event::Complete(_) if state.completion.is_some() => Work::Skip,
          Event::Send(value) => {
            state.memory.remember(&value);
            Work::Send(value, state.inboxes.snapshot())
          }
          Event::Complete(completion) => {
            state.completion = Some(completion.clone());
            let inboxes = state.inboxes.drain().collect();
            Work::Complete(completion, inboxes, std::mem::take(&mut state.sources))
          }
          Event::Prime(inbox) => Work::Prime(inbox, state.memory.recall()),
        }
      };

      match work {
        Work::Send(value, inboxes) => {
          // The last inbox gets the value itself, the others a clone.
          let mut iter = inboxes.into_iter().peekable();
          while let Some(inbox) = iter.next() {
            if iter.peek().is_some() {
              inbox.offer(value.clone());
            } else {
              inbox.offer(value);
              break;
            }
          }
        }
        Work::Complete(completion, inboxes, sources) => {
          tracing::debug!(failed = completion.is_failure(), subscribers = inboxes.len(), "subject completed");
          for source in sources {
            source.cancel();
          }
          for inbox in inboxes {
            inbox.complete(completion.clone());
          }
        }
        Work::Prime(inbox, value) => inbox.prime(value),
        Work::Skip => {}
      }
    }
  }
}

struct Conduit<T, E, S, M> {
  me: Weak<Self>,
  outlet: Outlet<T, E, S>,
  hub: Weak<Hub<T, E, M>>,
  id: OnceLock<usize>,
  // `Some` until a primed conduit has received the subject's value; holds
  // the demand granted meanwhile.
  unprimed: Mutex<Option<Demand>>,
}

impl<T, E, S, M> Subscription for Conduit<T, E, S, M>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
  S: Subscriber<T, E>,
  M: Memory<T>,
{
  fn request(&self, demand: Demand) {
    if demand.is_none() {
      return;
    }
    let first = {
      let mut unprimed = self.unprimed.lock();
      match unprimed.as_mut() {
        Some(pending) => {
          let first = pending.is_none();
          *pending += demand;
          Some(first)
        }
        None => None,
      }
    };
    match first {
      None => {
        self.outlet.request(demand);
      }
      Some(true) => {
        if let (Some(hub), Some(me)) = (self.hub.upgrade(), self.me.upgrade()) {
          hub.post(Event::Prime(me));
        }
      }
      Some(false) => {}
    }
  }

  fn cancel(&self) {
    self.outlet.cancel();
    self.unprimed.lock().take();
    if let (Some(hub), Some(id)) = (self.hub.upgrade(), self.id.get()) {
      hub.detach(*id);
    }
  }
}

impl<T, E, S, M> Inbox<T, E> for Conduit<T, E, S, M>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
  S: Subscriber<T, E>,
  M: Memory<T>,
{
  fn offer(&self, value: T) {
    // Subscribers without demand miss the value.
    self.outlet.offer(value);
  }

  fn complete(&self, completion: Completion<E>) { self.outlet.complete(completion) }

  fn prime(&self, value: Option<T>) {
    let Some(demand) = self.unprimed.lock().take() else { return };
    if let Some(value) = value {
      self.outlet.enqueue(value);
    }
    self.outlet.request(demand);
  }
}
