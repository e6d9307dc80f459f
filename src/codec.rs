//! Codec boundary for the `encode` and `decode` operators.
//!
//! Codecs are external collaborators: the engine only needs a value to bytes
//! function and its inverse. A JSON codec backed by `serde_json` is available
//! with the `json` feature.

use crate::error::CodecError;

pub trait Encoder<T>: Send + 'static {
  fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;
}

pub trait Decoder<T>: Send + 'static {
  fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Serializes values as JSON.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl<T: serde::Serialize> Encoder<T> for JsonCodec {
  fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|err| CodecError::Encode(err.to_string()))
  }
}

#[cfg(feature = "json")]
impl<T: serde::de::DeserializeOwned> Decoder<T> for JsonCodec {
  fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|err| CodecError::Decode(err.to_string()))
  }
}

#[cfg(all(test, feature = "json"))]
mod tests {
  use serde::{Deserialize, Serialize};

  use super::*;

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Reading {
    sensor: String,
    celsius: f64,
  }

  #[test]
  fn json_codec() {
    let reading = Reading { sensor: "t1".into(), celsius: 21.5 };
    let bytes = JsonCodec.encode(&reading).unwrap();
    assert_eq!(bytes, br#"{"sensor":"t1","celsius":21.5}"#.to_vec());

    let bad: Result<Reading, _> = JsonCodec.decode(b"{\"sensor\":");
    assert!(matches!(bad, Err(CodecError::Decode(_))));
  }
}
