use std::{
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
};

use futures::{
  channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
  Stream, StreamExt,
};

use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::{SubscriptionRef, Upstream},
};

/// A publisher consumed as a `futures::Stream`.
///
/// Demand follows polling: one value is requested whenever the stream is
/// polled with nothing buffered, so a slow consumer slows the publisher down.
/// A failure is yielded as the last item, `Err(failure)`. Dropping the stream
/// cancels the subscription.
pub struct PublisherStream<T, E> {
  items: UnboundedReceiver<Result<T, E>>,
  upstream: Arc<Upstream>,
  requested: bool,
}

impl<T, E> PublisherStream<T, E> {
  pub(crate) fn channel() -> (Self, ChannelSubscriber<T, E>) {
    let (tx, rx) = mpsc::unbounded();
    let upstream = Arc::new(Upstream::new());
    (
      Self { items: rx, upstream: upstream.clone(), requested: false },
      ChannelSubscriber { items: tx, upstream },
    )
  }
}

impl<T, E> Stream for PublisherStream<T, E> {
  type Item = Result<T, E>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    if let Poll::Ready(item) = self.items.poll_next_unpin(cx) {
      self.requested = false;
      return Poll::Ready(item);
    }
    if self.requested {
      return Poll::Pending;
    }
    self.requested = true;
    self.upstream.request(Demand::max(1));
    // Synchronous publishers answer inside `request`.
    match self.items.poll_next_unpin(cx) {
      Poll::Ready(item) => {
        self.requested = false;
        Poll::Ready(item)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

impl<T, E> Drop for PublisherStream<T, E> {
  fn drop(&mut self) { self.upstream.cancel(); }
}

pub(crate) struct ChannelSubscriber<T, E> {
  items: UnboundedSender<Result<T, E>>,
  upstream: Arc<Upstream>,
}

impl<T, E> Subscriber<T, E> for ChannelSubscriber<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  fn receive_subscription(&mut self, subscription: SubscriptionRef) { self.upstream.set(subscription) }

  fn receive(&mut self, input: T) -> Demand {
    // A closed channel means the stream was dropped and has cancelled.
    let _ = self.items.unbounded_send(Ok(input));
    Demand::NONE
  }

  fn receive_completion(self, completion: Completion<E>) {
    self.upstream.release();
    if let Completion::Failed(err) = completion {
      let _ = self.items.unbounded_send(Err(err));
    }
  }
}

#[cfg(test)]
mod tests {
  use futures::{executor::block_on, StreamExt};

  use crate::prelude::*;

  #[test]
  fn yields_values_then_ends() {
    let items: Vec<Result<i32, Infallible>> = block_on(from_iter(1..=3).into_stream().collect());
    assert_eq!(items, vec![Ok(1), Ok(2), Ok(3)]);
  }

  #[test]
  fn failure_is_the_last_item() {
    let items: Vec<_> = block_on(Record::failing([1], "gone").into_stream().collect());
    assert_eq!(items, vec![Ok(1), Err("gone")]);
  }

  #[test]
  fn requests_one_per_poll() {
    let requests = MutArc::own(vec![]);
    let r = requests.clone();
    let hooks = EventHooks::new().on_request(move |d| r.lock().push(d));
    let mut stream = from_iter(0..10).handle_events(hooks).into_stream();
    let first_two: Vec<_> = block_on(async {
      let a = stream.next().await;
      let b = stream.next().await;
      vec![a, b]
    });
    assert_eq!(first_two, vec![Some(Ok(0)), Some(Ok(1))]);
    assert_eq!(*requests.lock(), vec![Demand::max(1), Demand::max(1)]);
  }

  #[tokio::test]
  async fn values_from_another_task() {
    let subject = PublishSubject::<u8>::new();
    let mut stream = subject.clone().into_stream();
    // On the current-thread runtime the producer only runs once the consumer
    // is parked in `next`, after it has requested a value.
    let producer = tokio::spawn(async move {
      subject.send(7);
      subject.send_completion(Completion::Finished);
    });
    assert_eq!(stream.next().await, Some(Ok(7)));
    assert_eq!(stream.next().await, None);
    producer.await.unwrap();
  }
}
