use std::marker::PhantomData;

use super::try_map::TryMap;
use crate::{
  codec::{Decoder, Encoder},
  error::CodecError,
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Serializes every value with `encoder`. An encoding error fails the chain.
#[derive(Clone)]
pub struct Encode<P, C> {
  pub(crate) source: P,
  pub(crate) encoder: C,
}

impl<P, C> Publisher for Encode<P, C>
where
  P: Publisher,
  P::Failure: From<CodecError>,
  C: Encoder<P::Output>,
{
  type Output = Vec<u8>;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Vec<u8>, P::Failure>,
  {
    let encoder = self.encoder;
    TryMap { source: self.source, func: move |value: P::Output| encoder.encode(&value).map_err(P::Failure::from) }
      .subscribe(subscriber)
  }
}

/// Deserializes every chunk of bytes into a `T` with `decoder`. A decoding
/// error fails the chain.
pub struct Decode<P, C, T> {
  pub(crate) source: P,
  pub(crate) decoder: C,
  pub(crate) _output: PhantomData<fn() -> T>,
}

impl<P: Clone, C: Clone, T> Clone for Decode<P, C, T> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone(), decoder: self.decoder.clone(), _output: PhantomData }
  }
}

impl<P, C, T> Publisher for Decode<P, C, T>
where
  P: Publisher,
  P::Output: AsRef<[u8]>,
  P::Failure: From<CodecError>,
  C: Decoder<T>,
  T: Send + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<T, P::Failure>,
  {
    let decoder = self.decoder;
    TryMap {
      source: self.source,
      func: move |bytes: P::Output| decoder.decode(bytes.as_ref()).map_err(P::Failure::from),
    }
    .subscribe(subscriber)
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  /// Little-endian `u32`s.
  #[derive(Clone, Copy)]
  struct Le;

  impl Encoder<u32> for Le {
    fn encode(&self, value: &u32) -> Result<Vec<u8>, CodecError> { Ok(value.to_le_bytes().to_vec()) }
  }

  impl Decoder<u32> for Le {
    fn decode(&self, bytes: &[u8]) -> Result<u32, CodecError> {
      let bytes: [u8; 4] = bytes.try_into().map_err(|_| CodecError::Decode(format!("{} bytes", bytes.len())))?;
      Ok(u32::from_le_bytes(bytes))
    }
  }

  #[test]
  fn encodes_then_decodes() {
    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter([1u32, 258])
      .set_failure_type::<CodecError>()
      .encode(Le)
      .decode::<u32, _>(Le)
      .subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1, 258]);
    assert!(recorder.is_finished());
  }

  #[test]
  fn decode_error_fails_the_chain() {
    let (subscriber, recorder) = TestSubscriber::<u32, CodecError>::unlimited();
    from_iter([vec![1, 0, 0, 0], vec![1, 2]]).set_failure_type::<CodecError>().decode::<u32, _>(Le).subscribe(subscriber);
    assert_eq!(recorder.values(), vec![1]);
    assert_eq!(recorder.failure(), Some(CodecError::Decode("2 bytes".into())));
  }

  #[cfg(feature = "json")]
  #[test]
  fn json_round_trip() {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tick {
      seq: u32,
    }

    let (subscriber, recorder) = TestSubscriber::unlimited();
    from_iter([Tick { seq: 1 }, Tick { seq: 2 }])
      .set_failure_type::<CodecError>()
      .encode(JsonCodec)
      .decode::<Tick, _>(JsonCodec)
      .subscribe(subscriber);
    assert_eq!(recorder.values(), vec![Tick { seq: 1 }, Tick { seq: 2 }]);
  }
}
