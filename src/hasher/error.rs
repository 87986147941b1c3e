use crate::{arena::ArenaError, encoding::EncodingError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("Password length cannot be greater than 4294967295 bytes, found {length}")]
    PasswordTooLong { length: usize },
    #[error("Invalid salt provided. Initialized length was {expected}, found {actual}")]
    SaltLengthMismatch { expected: u32, actual: usize },
    #[error("invalid salt encoding: {0}")]
    InvalidSalt(EncodingError),
    #[error("arena allocation of {requested} bytes failed")]
    AllocationFailed { requested: u32 },
    #[error("native module error: {0}")]
    Arena(ArenaError),
    #[error("engine has been destroyed")]
    EngineDestroyed,
    #[error("hash did not complete within {0:?}")]
    HashTimeout(Duration),
    #[error("hashing task failed: {0}")]
    Offload(String),
}

impl From<ArenaError> for HashError {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::OutOfMemory { requested } => Self::AllocationFailed { requested },
            other => Self::Arena(other),
        }
    }
}
