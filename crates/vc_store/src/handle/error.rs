use thiserror::Error;

use crate::handle::{HandleId, Version};

// -----------------------------------------------------------------------------
// Error

/// Failure of a version-checked [`HandleAllocator`](crate::handle::HandleAllocator) operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandleError {
    #[error("Attempted to use a null handle")]
    Null,

    #[error("Handle id {0} does not address an allocated slot")]
    OutOfRange(HandleId),

    #[error("Handle id {0} refers to a slot that is not occupied")]
    Vacant(HandleId),

    #[error("Stale handle {id}v{version}: the slot is at version {current}")]
    Stale {
        id: HandleId,
        version: u32,
        current: Version,
    },
}

impl HandleError {
    #[cold]
    #[inline(never)]
    pub fn handle_error(&self) -> ! {
        panic!("{self}");
    }
}

/// Failure of [`HandleAllocator::try_alloc`](crate::handle::HandleAllocator::try_alloc).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AllocError {
    #[error("All {pools} handle pools are full ({capacity} slots)")]
    PoolsExhausted { pools: u32, capacity: u64 },
}

impl AllocError {
    #[cold]
    #[inline(never)]
    pub fn handle_error(&self) -> ! {
        panic!("{self}");
    }
}
