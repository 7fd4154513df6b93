//! Dense object storage with stable handles.
//!
//! [`ObjectStorage`] keeps its objects packed at the front of a
//! [`PageStorage`](crate::page::PageStorage) and hands out [`Handle32`]s that
//! survive the moves caused by compaction. The owner supplies a
//! [`HandleFetcher`] on destroy so the storage can find the handle of the
//! object it moves.

// -----------------------------------------------------------------------------
// Modules

mod fetcher;
mod ident;
mod iter;
mod storage;

// -----------------------------------------------------------------------------
// Exports

pub use fetcher::HandleFetcher;
pub use ident::Handle32;
pub use iter::{Iter, IterMut};
pub use storage::{MovedObject, ObjectStorage};
