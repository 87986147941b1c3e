use super::{Allocation, ArenaError, NativeModule};
use tracing::warn;
use zeroize::Zeroizing;

/// Scoped owner of a single arena allocation.
///
/// [`ArenaBuffer::release`] zeroes and frees the allocation and reports
/// failures. A buffer dropped without `release` (an early `?` return) does
/// the same in `Drop`, logging what it cannot return.
#[derive(Debug)]
pub struct ArenaBuffer<'m, M: NativeModule + ?Sized> {
    module: &'m M,
    allocation: Allocation,
    live: bool,
}

impl<'m, M: NativeModule + ?Sized> ArenaBuffer<'m, M> {
    /// # Errors
    ///
    /// Propagates the module's allocation failure.
    pub fn allocate(module: &'m M, len: u32) -> Result<Self, ArenaError> {
        let allocation = module.allocate(len)?;
        Ok(Self::adopt(module, allocation))
    }

    /// Take ownership of an allocation the module produced, such as a digest.
    pub fn adopt(module: &'m M, allocation: Allocation) -> Self {
        Self {
            module,
            allocation,
            live: true,
        }
    }

    #[must_use]
    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// # Errors
    ///
    /// Propagates module write failures.
    pub fn write(&self, bytes: &[u8]) -> Result<(), ArenaError> {
        self.module.write(self.allocation, bytes)
    }

    /// # Errors
    ///
    /// Propagates module read failures.
    pub fn read(&self) -> Result<Zeroizing<Vec<u8>>, ArenaError> {
        self.module.read(self.allocation)
    }

    /// Zero and free the allocation.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the free is still attempted when zeroing
    /// fails.
    pub fn release(mut self) -> Result<(), ArenaError> {
        self.live = false;
        self.scrub_and_free()
    }

    fn scrub_and_free(&self) -> Result<(), ArenaError> {
        let zeroed = self.module.zero(self.allocation);
        let freed = self.module.free(self.allocation);
        zeroed.and(freed)
    }
}

impl<M: NativeModule + ?Sized> Drop for ArenaBuffer<'_, M> {
    fn drop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Err(err) = self.scrub_and_free() {
            warn!(
                offset = self.allocation.offset,
                len = self.allocation.len,
                "failed to release arena buffer: {err}"
            );
        }
    }
}
