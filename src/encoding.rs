//! Standard padded base64 for persisting salts and digests as text.

use base64ct::{Base64, Encoding};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid base64 encoding")]
    InvalidEncoding,
    #[error("invalid base64 length")]
    InvalidLength,
}

impl From<base64ct::Error> for EncodingError {
    fn from(err: base64ct::Error) -> Self {
        match err {
            base64ct::Error::InvalidLength => Self::InvalidLength,
            _ => Self::InvalidEncoding,
        }
    }
}

#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode standard base64. Decoding is strict: URL-safe characters, missing
/// padding and non-canonical trailing bits are rejected.
///
/// # Errors
///
/// Returns an [`EncodingError`] when `text` is not canonical padded base64.
pub fn decode(text: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(Base64::decode_vec(text)?)
}
