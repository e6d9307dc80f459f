use std::marker::PhantomData;

use super::Publisher;
use crate::{subscriber::Subscriber, subscription::EmptySubscription};

/// Never emits and never completes.
pub struct Never<T, E>(PhantomData<fn() -> (T, E)>);

pub fn never<T, E>() -> Never<T, E> { Never(PhantomData) }

impl<T, E> Clone for Never<T, E> {
  fn clone(&self) -> Self { never() }
}

impl<T, E> Publisher for Never<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(self, mut subscriber: S)
  where
    S: Subscriber<T, E>,
  {
    subscriber.receive_subscription(EmptySubscription::shared());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{Event, TestSubscriber};

  #[test]
  fn only_subscribes() {
    let (subscriber, recorder) = TestSubscriber::<u8, ()>::unlimited();
    never().subscribe(subscriber);
    assert_eq!(recorder.events(), vec![Event::Subscribed]);
  }
}
