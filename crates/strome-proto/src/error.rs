//! Encoding error types.

use thiserror::Error;

/// Errors raised while encoding or decoding dictionaries.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// NaN and infinities have no object-notation representation.
    #[error("cannot encode non-finite float {0}")]
    NonFiniteFloat(f64),

    /// Integer literal does not fit a signed 64-bit value.
    #[error("integer {0} is out of range")]
    IntegerOutOfRange(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}
