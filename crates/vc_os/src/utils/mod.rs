//! Busy-wait synchronization.
//!
//! - [`Backoff`] : exponential backoff for spin loops.
//! - [`SpinLock`] : a lock similar to `Mutex`, but threads busy-wait instead of sleeping.

// -----------------------------------------------------------------------------
// Modules

mod backoff;
mod spin_lock;

// -----------------------------------------------------------------------------
// Exports

pub use backoff::Backoff;
pub use spin_lock::{SpinLock, SpinLockGuard};
