//! Password hashing capability exposed to the rest of the application.
//!
//! Callers see only printable base64 text; arena offsets and raw bytes stay
//! inside [`engine::Engine`].

pub mod config;
pub mod engine;
pub mod error;
pub mod offload;

pub use self::config::{ConfigError, HashConfig, ValidatedConfig};
pub use self::engine::Engine;
pub use self::error::HashError;

use serde::Serialize;

/// Printable result of a hash call, suitable for a text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashOutput {
    pub digest: String,
    pub salt: String,
}

pub trait PasswordHasher {
    /// Hash `password` with the supplied base64 salt, or a freshly generated
    /// one when `salt` is `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] for invalid input or native module failure.
    fn hash(&self, password: &str, salt: Option<&str>) -> Result<HashOutput, HashError>;

    /// Recompute the digest for `password` and `salt` and compare it with
    /// `digest`.
    ///
    /// # Errors
    ///
    /// Salt errors and native module failures are returned rather than
    /// reported as a mismatch.
    fn verify(&self, password: &str, salt: &str, digest: &str) -> Result<bool, HashError>;
}
