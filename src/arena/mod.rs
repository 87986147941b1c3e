//! Foreign memory arena shared with the native hashing module.
//!
//! The hashing primitive lives behind an allocate/write/call/read/free
//! protocol over a byte region it owns. [`NativeModule`] is that protocol with
//! types attached; [`ArenaBuffer`] ties one allocation to a scope so it is
//! zeroed and freed exactly once on every exit path.
//!
//! [`linear::LinearModule`] is the in-process binding shipped with the crate.

pub mod buffer;
pub mod linear;

pub use self::buffer::ArenaBuffer;
pub use self::linear::{CostParams, LinearModule, LinearOptions};

use thiserror::Error;
use zeroize::Zeroizing;

/// A live `(offset, len)` range inside the module's memory.
///
/// Only valid between the `allocate` that produced it and the matching `free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub offset: u32,
    pub len: u32,
}

/// Opaque handle to the hashing context created once per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextHandle(pub(crate) u32);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena exhausted while allocating {requested} bytes")]
    OutOfMemory { requested: u32 },
    #[error("no live allocation at offset {offset}")]
    InvalidFree { offset: u32 },
    #[error("range {offset}+{len} is outside the arena")]
    OutOfBounds { offset: u32, len: u32 },
    #[error("write of {actual} bytes into a {expected} byte allocation")]
    LengthMismatch { expected: u32, actual: usize },
    #[error("invalid hashing context")]
    InvalidContext,
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("hash computation failed: {0}")]
    Computation(String),
}

/// Typed interface to a native hashing module.
///
/// Implementations must keep allocations disjoint under concurrent use and
/// must free every buffer they allocate internally when a call fails.
pub trait NativeModule: Send + Sync {
    /// Reserve `len` bytes in the module's memory.
    ///
    /// # Errors
    ///
    /// [`ArenaError::OutOfMemory`] when the region cannot grow far enough.
    fn allocate(&self, len: u32) -> Result<Allocation, ArenaError>;

    /// Return an allocation to the module.
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidFree`] if `allocation` is not live.
    fn free(&self, allocation: Allocation) -> Result<(), ArenaError>;

    /// Copy `bytes` into `allocation`; the lengths must match.
    ///
    /// # Errors
    ///
    /// Fails when the allocation is not live or the length differs.
    fn write(&self, allocation: Allocation, bytes: &[u8]) -> Result<(), ArenaError>;

    /// Copy the contents of `allocation` out to host memory.
    ///
    /// # Errors
    ///
    /// Fails when the allocation is not live.
    fn read(&self, allocation: Allocation) -> Result<Zeroizing<Vec<u8>>, ArenaError>;

    /// Overwrite `allocation` with zeros.
    ///
    /// # Errors
    ///
    /// Fails when the allocation is not live.
    fn zero(&self, allocation: Allocation) -> Result<(), ArenaError>;

    /// Allocate the long-lived hashing context.
    ///
    /// # Errors
    ///
    /// Fails when the module cannot hold the context or its parameters are
    /// rejected by the primitive.
    fn create_context(&self) -> Result<ContextHandle, ArenaError>;

    /// Release a context created by [`NativeModule::create_context`].
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidContext`] if the handle is unknown.
    fn release_context(&self, context: ContextHandle) -> Result<(), ArenaError>;

    /// Hash the password and salt buffers into a fresh digest allocation of
    /// `output_len` bytes. The caller owns the returned allocation.
    ///
    /// # Errors
    ///
    /// Fails on an unknown context, a dead input allocation, arena
    /// exhaustion, or a primitive error. No allocation survives a failure.
    fn compute_hash(
        &self,
        context: ContextHandle,
        password: Allocation,
        salt: Allocation,
        output_len: u32,
    ) -> Result<Allocation, ArenaError>;
}

/// Zero-filled host buffer of `len` bytes that reports allocator exhaustion
/// instead of aborting.
///
/// # Errors
///
/// [`ArenaError::OutOfMemory`] when the host cannot reserve `len` bytes.
pub(crate) fn host_buffer(len: usize) -> Result<Zeroizing<Vec<u8>>, ArenaError> {
    let mut buffer = Zeroizing::new(Vec::new());
    buffer
        .try_reserve_exact(len)
        .map_err(|_| ArenaError::OutOfMemory {
            requested: u32::try_from(len).unwrap_or(u32::MAX),
        })?;
    buffer.resize(len, 0);
    Ok(buffer)
}
