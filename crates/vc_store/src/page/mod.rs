//! Paged raw memory.
//!
//! [`PageAllocator`] owns fixed-size, 16-byte aligned pages and maps a flat
//! index to `(page, offset)`; [`PageStorage`] adds the element type on top.
//! Growing never moves existing pages, so addresses stay valid until the
//! page holding them is released by a shrink.

// -----------------------------------------------------------------------------
// Modules

mod allocator;
mod storage;

// -----------------------------------------------------------------------------
// Exports

pub use allocator::{DEFAULT_PAGE_SIZE, PAGE_ALIGN, PageAllocator};
pub use storage::PageStorage;
