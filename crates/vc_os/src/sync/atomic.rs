//! Provide atomic types
//!
//! If the target platform does not have a corresponding atomic type,
//! this will switch to `portable_atomic`.
//!
//! Atomic pointers are always taken from `core`, the allocators store
//! their pools behind them.

pub use atomic_8::AtomicBool;
pub use atomic_32::AtomicU32;
pub use core::sync::atomic::{AtomicPtr, Ordering};

#[cfg(target_has_atomic = "8")]
use core::sync::atomic as atomic_8;

#[cfg(not(target_has_atomic = "8"))]
use portable_atomic as atomic_8;

#[cfg(target_has_atomic = "32")]
use core::sync::atomic as atomic_32;

#[cfg(not(target_has_atomic = "32"))]
use portable_atomic as atomic_32;

#[cfg(not(target_has_atomic = "ptr"))]
compile_error!("Platforms without atomic pointers are currently not supported.");
