//! Generational handles and paged object storage.
//!
//! Three building blocks, leaf first:
//!
//! - [`page`]: [`PageAllocator`](page::PageAllocator) hands out fixed-size raw
//!   pages and translates a flat index into an address;
//!   [`PageStorage`](page::PageStorage) is its typed wrapper.
//! - [`handle`]: [`HandleAllocator`](handle::HandleAllocator) issues versioned
//!   [`Handle`](handle::Handle)s over doubling pools and detects stale handles.
//! - [`object`]: [`ObjectStorage`](object::ObjectStorage) keeps live objects
//!   densely packed in pages, compacting on destroy.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![expect(unsafe_code, reason = "Storages place values into raw memory.")]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod handle;
pub mod object;
pub mod page;
pub mod utils;
