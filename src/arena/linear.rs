//! In-process linear-memory binding for the Argon2 primitive.
//!
//! Memory is a page-granular byte region that starts at one 64 KiB page and
//! grows on demand up to `max_pages`, never shrinking. Offset 0 is reserved as
//! null. Blocks are 8-byte aligned and handed out first-fit from a free list,
//! falling back to the top of the used region; freed neighbours coalesce.

use super::{host_buffer, Allocation, ArenaError, ContextHandle, NativeModule};
use argon2::{Algorithm, Argon2, Params, Version};
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Range,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::trace;
use zeroize::Zeroizing;

pub const PAGE_SIZE: u64 = 64 * 1024;
pub const MAX_PAGES: u32 = 1 << 16;

const HEAP_BASE: u64 = 8;
const ALIGN: u64 = 8;

// Context record: algorithm, version, memory KiB, iterations, lanes (u32 LE).
const CONTEXT_LEN: u32 = 20;
const ALGORITHM_ARGON2ID: u32 = 2;
const VERSION_0X13: u32 = 0x13;

/// Argon2 cost parameters carried by the hashing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub lanes: u32,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            lanes: Params::DEFAULT_P_COST,
        }
    }
}

impl CostParams {
    /// Cheapest parameters the primitive accepts. Only suitable for tests.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            lanes: 1,
        }
    }

    fn params(self) -> Result<Params, ArenaError> {
        Params::new(self.memory_kib, self.iterations, self.lanes, None)
            .map_err(|e| ArenaError::InvalidParams(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearOptions {
    pub max_pages: u32,
    pub costs: CostParams,
}

impl Default for LinearOptions {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            costs: CostParams::default(),
        }
    }
}

#[derive(Debug)]
struct LinearState {
    memory: Vec<u8>,
    max_bytes: u64,
    top: u64,
    // offset -> reserved (aligned) length
    free: BTreeMap<u64, u64>,
    // offset -> (requested length, reserved length)
    live: BTreeMap<u32, (u32, u64)>,
    contexts: BTreeSet<u32>,
}

impl LinearState {
    fn new(max_pages: u32) -> Self {
        let max_pages = u64::from(max_pages.clamp(1, MAX_PAGES));
        Self {
            memory: vec![0; page_bytes(1)],
            max_bytes: max_pages * PAGE_SIZE,
            top: HEAP_BASE,
            free: BTreeMap::new(),
            live: BTreeMap::new(),
            contexts: BTreeSet::new(),
        }
    }

    fn allocate(&mut self, len: u32) -> Result<Allocation, ArenaError> {
        let size = align_up(u64::from(len).max(1));

        let reusable = self
            .free
            .iter()
            .find(|(_, &block)| block >= size)
            .map(|(&offset, &block)| (offset, block));

        let offset = if let Some((offset, block)) = reusable {
            self.free.remove(&offset);
            if block > size {
                self.free.insert(offset + size, block - size);
            }
            offset
        } else {
            let offset = self.top;
            let end = offset + size;
            if end > self.max_bytes {
                return Err(ArenaError::OutOfMemory { requested: len });
            }
            self.grow_to(end)?;
            self.top = end;
            offset
        };

        let offset = u32::try_from(offset).map_err(|_| ArenaError::OutOfMemory { requested: len })?;
        self.live.insert(offset, (len, size));
        trace!(offset, len, "arena allocate");

        Ok(Allocation { offset, len })
    }

    fn free(&mut self, allocation: Allocation) -> Result<(), ArenaError> {
        let mut size = match self.live.get(&allocation.offset) {
            Some(&(len, size)) if len == allocation.len => size,
            _ => {
                return Err(ArenaError::InvalidFree {
                    offset: allocation.offset,
                })
            }
        };
        self.live.remove(&allocation.offset);
        trace!(offset = allocation.offset, len = allocation.len, "arena free");

        let mut start = u64::from(allocation.offset);

        if let Some((&prev, &prev_len)) = self.free.range(..start).next_back() {
            if prev + prev_len == start {
                self.free.remove(&prev);
                start = prev;
                size += prev_len;
            }
        }
        if let Some(next_len) = self.free.remove(&(start + size)) {
            size += next_len;
        }

        if start + size == self.top {
            self.top = start;
        } else {
            self.free.insert(start, size);
        }

        Ok(())
    }

    fn grow_to(&mut self, end: u64) -> Result<(), ArenaError> {
        let current = self.memory.len() as u64;
        if end <= current {
            return Ok(());
        }
        let pages = end.div_ceil(PAGE_SIZE);
        let exhausted = ArenaError::OutOfMemory {
            requested: u32::try_from(end - current).unwrap_or(u32::MAX),
        };
        let bytes = usize::try_from(pages * PAGE_SIZE).map_err(|_| exhausted.clone())?;
        self.memory
            .try_reserve_exact(bytes - self.memory.len())
            .map_err(|_| exhausted)?;
        self.memory.resize(bytes, 0);
        Ok(())
    }

    fn range(&self, allocation: Allocation) -> Result<Range<usize>, ArenaError> {
        let out_of_bounds = ArenaError::OutOfBounds {
            offset: allocation.offset,
            len: allocation.len,
        };
        match self.live.get(&allocation.offset) {
            Some(&(len, _)) if len == allocation.len => {}
            _ => return Err(out_of_bounds),
        }
        let start = allocation.offset as usize;
        let end = start + allocation.len as usize;
        if end > self.memory.len() {
            return Err(out_of_bounds);
        }
        Ok(start..end)
    }

    fn read(&self, allocation: Allocation) -> Result<Zeroizing<Vec<u8>>, ArenaError> {
        let range = self.range(allocation)?;
        let mut bytes = host_buffer(range.len())?;
        bytes.copy_from_slice(&self.memory[range]);
        Ok(bytes)
    }

    fn write(&mut self, allocation: Allocation, bytes: &[u8]) -> Result<(), ArenaError> {
        if bytes.len() != allocation.len as usize {
            return Err(ArenaError::LengthMismatch {
                expected: allocation.len,
                actual: bytes.len(),
            });
        }
        let range = self.range(allocation)?;
        self.memory[range].copy_from_slice(bytes);
        Ok(())
    }

    fn context_params(&self, context: ContextHandle) -> Result<Params, ArenaError> {
        if !self.contexts.contains(&context.0) {
            return Err(ArenaError::InvalidContext);
        }
        let record = self.read(Allocation {
            offset: context.0,
            len: CONTEXT_LEN,
        })?;
        let mut fields = record
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        let mut next = || fields.next().ok_or(ArenaError::InvalidContext);

        if next()? != ALGORITHM_ARGON2ID || next()? != VERSION_0X13 {
            return Err(ArenaError::InvalidContext);
        }
        CostParams {
            memory_kib: next()?,
            iterations: next()?,
            lanes: next()?,
        }
        .params()
    }
}

/// Native module backed by a growable linear memory inside this process.
#[derive(Debug)]
pub struct LinearModule {
    costs: CostParams,
    state: Mutex<LinearState>,
}

impl LinearModule {
    #[must_use]
    pub fn new(options: LinearOptions) -> Self {
        Self {
            costs: options.costs,
            state: Mutex::new(LinearState::new(options.max_pages)),
        }
    }

    /// Allocations currently live, not counting hashing contexts.
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        let state = self.state();
        state.live.len() - state.contexts.len()
    }

    /// Current size of the memory region in pages.
    #[must_use]
    pub fn pages(&self) -> u64 {
        self.state().memory.len() as u64 / PAGE_SIZE
    }

    fn state(&self) -> MutexGuard<'_, LinearState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn peek(&self, offset: u32, len: usize) -> Vec<u8> {
        let start = offset as usize;
        self.state().memory[start..start + len].to_vec()
    }
}

impl Default for LinearModule {
    fn default() -> Self {
        Self::new(LinearOptions::default())
    }
}

impl NativeModule for LinearModule {
    fn allocate(&self, len: u32) -> Result<Allocation, ArenaError> {
        self.state().allocate(len)
    }

    fn free(&self, allocation: Allocation) -> Result<(), ArenaError> {
        let mut state = self.state();
        if state.contexts.contains(&allocation.offset) {
            return Err(ArenaError::InvalidFree {
                offset: allocation.offset,
            });
        }
        state.free(allocation)
    }

    fn write(&self, allocation: Allocation, bytes: &[u8]) -> Result<(), ArenaError> {
        self.state().write(allocation, bytes)
    }

    fn read(&self, allocation: Allocation) -> Result<Zeroizing<Vec<u8>>, ArenaError> {
        self.state().read(allocation)
    }

    fn zero(&self, allocation: Allocation) -> Result<(), ArenaError> {
        let mut state = self.state();
        let range = state.range(allocation)?;
        state.memory[range].fill(0);
        Ok(())
    }

    fn create_context(&self) -> Result<ContextHandle, ArenaError> {
        self.costs.params()?;

        let mut record = Vec::with_capacity(CONTEXT_LEN as usize);
        for word in [
            ALGORITHM_ARGON2ID,
            VERSION_0X13,
            self.costs.memory_kib,
            self.costs.iterations,
            self.costs.lanes,
        ] {
            record.extend_from_slice(&word.to_le_bytes());
        }

        let mut state = self.state();
        let allocation = state.allocate(CONTEXT_LEN)?;
        if let Err(err) = state.write(allocation, &record) {
            state.free(allocation)?;
            return Err(err);
        }
        state.contexts.insert(allocation.offset);

        Ok(ContextHandle(allocation.offset))
    }

    fn release_context(&self, context: ContextHandle) -> Result<(), ArenaError> {
        let mut state = self.state();
        if !state.contexts.remove(&context.0) {
            return Err(ArenaError::InvalidContext);
        }
        let allocation = Allocation {
            offset: context.0,
            len: CONTEXT_LEN,
        };
        let range = state.range(allocation)?;
        state.memory[range].fill(0);
        state.free(allocation)
    }

    fn compute_hash(
        &self,
        context: ContextHandle,
        password: Allocation,
        salt: Allocation,
        output_len: u32,
    ) -> Result<Allocation, ArenaError> {
        let (params, password_bytes, salt_bytes, digest) = {
            let mut state = self.state();
            let params = state.context_params(context)?;
            let password_bytes = state.read(password)?;
            let salt_bytes = state.read(salt)?;
            let digest = state.allocate(output_len)?;
            (params, password_bytes, salt_bytes, digest)
        };

        // The digest allocation is already reserved, so the lock can be
        // released for the expensive part.
        let computed = host_buffer(output_len as usize).and_then(|mut output| {
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(&password_bytes, &salt_bytes, &mut output)
                .map_err(|e| ArenaError::Computation(e.to_string()))?;
            Ok(output)
        });

        let mut state = self.state();
        if let Err(err) = computed.and_then(|output| state.write(digest, &output)) {
            state.free(digest)?;
            return Err(err);
        }

        Ok(digest)
    }
}

fn align_up(len: u64) -> u64 {
    len.div_ceil(ALIGN) * ALIGN
}

fn page_bytes(pages: u64) -> usize {
    (pages * PAGE_SIZE) as usize
}
