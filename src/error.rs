//! Failures the engine produces itself.
//!
//! Everything else a chain can fail with is the chain's own `Failure` type.
//! Operators that can fail on their own require `Failure: From<...>` for the
//! matching error below.

use std::time::Duration;

use thiserror::Error;

/// Raised by `timeout` when no value or completion arrived in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no value received within {after:?}")]
pub struct TimeoutError {
  pub after: Duration,
}

/// Raised by the `encode` and `decode` operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
  #[error("encode failed: {0}")]
  Encode(String),

  #[error("decode failed: {0}")]
  Decode(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages() {
    let err = TimeoutError { after: Duration::from_millis(250) };
    assert_eq!(err.to_string(), "no value received within 250ms");
    assert_eq!(CodecError::Decode("eof".into()).to_string(), "decode failed: eof");
  }
}
