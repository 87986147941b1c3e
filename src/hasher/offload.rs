//! Run hash calls on tokio's blocking pool with an optional bounded wait.
//!
//! The primitive cannot be preempted: when the bound expires the caller gets
//! [`HashError::HashTimeout`] while the computation finishes in the
//! background and releases its own buffers.

use super::{HashError, HashOutput, PasswordHasher};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::warn;

/// Hash on the blocking pool, giving up after `limit` when one is set.
///
/// # Errors
///
/// [`HashError::HashTimeout`] when the bound expires, otherwise whatever the
/// hasher returns.
pub async fn hash_with_timeout<H>(
    hasher: Arc<H>,
    password: SecretString,
    salt: Option<String>,
    limit: Option<Duration>,
) -> Result<HashOutput, HashError>
where
    H: PasswordHasher + Send + Sync + 'static,
{
    let task =
        tokio::task::spawn_blocking(move || hasher.hash(password.expose_secret(), salt.as_deref()));
    wait(task, limit).await
}

/// Verify on the blocking pool, giving up after `limit` when one is set.
///
/// # Errors
///
/// [`HashError::HashTimeout`] when the bound expires, otherwise whatever the
/// hasher returns.
pub async fn verify_with_timeout<H>(
    hasher: Arc<H>,
    password: SecretString,
    salt: String,
    digest: String,
    limit: Option<Duration>,
) -> Result<bool, HashError>
where
    H: PasswordHasher + Send + Sync + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        hasher.verify(password.expose_secret(), &salt, &digest)
    });
    wait(task, limit).await
}

async fn wait<T>(
    task: JoinHandle<Result<T, HashError>>,
    limit: Option<Duration>,
) -> Result<T, HashError> {
    let joined = match limit {
        Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
            warn!(?limit, "hash call exceeded its time limit");
            HashError::HashTimeout(limit)
        })?,
        None => task.await,
    };

    joined.map_err(|e| HashError::Offload(e.to_string()))?
}
