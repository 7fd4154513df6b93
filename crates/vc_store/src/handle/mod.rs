//! Versioned handles over pooled slots.
//!
//! [`HandleAllocator`] owns values and hands out [`Handle`]s. A handle is a
//! packed [`HandleId`] (pool and slot index) plus the slot's [`Version`] at
//! allocation time, so a handle to a freed slot is detected as stale even
//! after the slot has been reused.

// -----------------------------------------------------------------------------
// Modules

mod allocator;
mod error;
mod ident;

// -----------------------------------------------------------------------------
// Exports

pub use allocator::{FIRST_POOL_CAPACITY, HandleAllocator, Iter, MAX_POOLS, pool_capacity};
pub use error::{AllocError, HandleError};
pub use ident::{Handle, HandleId, Version};
