//! Synchronization primitives.
//!
//! Only the atomic layer lives here; locks are in [`utils`](crate::utils)
//! because every lock in this workspace is a busy-wait lock.

pub mod atomic;
