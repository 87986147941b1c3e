use crate::arena::ArenaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_SALT_LENGTH: u64 = 8;
pub const MIN_OUTPUT_LENGTH: u64 = 4;
pub const MAX_LENGTH: u64 = 0xFFFF_FFFF;

/// Salt and digest sizes for one engine, in bytes.
///
/// Fields are wider than the validated range so out-of-range requests coming
/// from callers are representable and rejected rather than truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashConfig {
    pub salt_length: u64,
    pub output_length: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Salt length cannot be less than 8 bytes")]
    SaltTooShort,
    #[error("Salt length cannot be greater than 4294967295 bytes")]
    SaltTooLong,
    #[error("Output length cannot be less than 4 bytes")]
    OutputTooShort,
    #[error("Output length cannot be greater than 4294967295 bytes")]
    OutputTooLong,
    #[error("failed to instantiate hashing module: {0}")]
    Instantiation(ArenaError),
}

/// Bounds-checked lengths, ready for the native module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub salt_length: u32,
    pub output_length: u32,
}

impl HashConfig {
    #[must_use]
    pub const fn new(salt_length: u64, output_length: u64) -> Self {
        Self {
            salt_length,
            output_length,
        }
    }

    /// Check salt bounds, then output bounds; the first violation wins.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] for the first bound violated.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.salt_length < MIN_SALT_LENGTH {
            return Err(ConfigError::SaltTooShort);
        }
        let salt_length = u32::try_from(self.salt_length).map_err(|_| ConfigError::SaltTooLong)?;

        if self.output_length < MIN_OUTPUT_LENGTH {
            return Err(ConfigError::OutputTooShort);
        }
        let output_length =
            u32::try_from(self.output_length).map_err(|_| ConfigError::OutputTooLong)?;

        Ok(ValidatedConfig {
            salt_length,
            output_length,
        })
    }
}
