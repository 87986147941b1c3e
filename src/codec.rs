//! Text to byte conversion for data crossing into the arena.
//!
//! Text is expanded to UTF-16 code units, each stored as two bytes with the
//! low byte first. Digests stay compatible with records produced by hashers
//! that feed the module UTF-16LE passwords.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("byte length {0} is not a multiple of two")]
    OddLength(usize),
    #[error("bytes are not valid UTF-16")]
    InvalidUtf16,
}

/// Expand `text` into little-endian UTF-16 bytes.
#[must_use]
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Inverse of [`text_to_bytes`].
///
/// # Errors
///
/// Returns [`CodecError::OddLength`] instead of truncating a trailing byte,
/// and [`CodecError::InvalidUtf16`] for unpaired surrogates.
pub fn bytes_to_text(bytes: &[u8]) -> Result<String, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::OddLength(bytes.len()));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|_| CodecError::InvalidUtf16)
}
