//! Platform primitives shared by the `vc_*` crates.
//!
//! - [`sync::atomic`]: atomic types, falling back to `portable_atomic` on
//!   targets without native support.
//! - [`utils`]: busy-wait synchronization ([`utils::SpinLock`], [`utils::Backoff`]).
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

pub mod sync;
pub mod utils;
