use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::slice;

use crate::page::PageStorage;

// -----------------------------------------------------------------------------
// Iter

/// Iterator over the live objects of an [`ObjectStorage`](super::ObjectStorage),
/// one page slice at a time.
pub struct Iter<'a, T, const PAGE_SIZE: usize> {
    storage: &'a PageStorage<T, PAGE_SIZE>,
    next_page: usize,
    /// Live objects in pages not yet entered.
    remaining: usize,
    current: slice::Iter<'a, T>,
}

impl<'a, T, const PAGE_SIZE: usize> Iter<'a, T, PAGE_SIZE> {
    /// Slots `0..len` of `storage` must be initialized.
    #[inline]
    pub(super) fn new(storage: &'a PageStorage<T, PAGE_SIZE>, len: usize) -> Self {
        Self {
            storage,
            next_page: 0,
            remaining: len,
            current: slice::Iter::default(),
        }
    }
}

impl<'a, T, const PAGE_SIZE: usize> Iterator for Iter<'a, T, PAGE_SIZE> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.current.next() {
                return Some(object);
            }
            if self.remaining == 0 {
                return None;
            }

            let run = self.remaining.min(PAGE_SIZE);
            // SAFETY: The first `run` slots of the page are live.
            self.current = unsafe { self.storage.page_slice(self.next_page, run) }.iter();
            self.next_page += 1;
            self.remaining -= run;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.current.len() + self.remaining;
        (len, Some(len))
    }
}

impl<T, const PAGE_SIZE: usize> ExactSizeIterator for Iter<'_, T, PAGE_SIZE> {}
impl<T, const PAGE_SIZE: usize> FusedIterator for Iter<'_, T, PAGE_SIZE> {}

// -----------------------------------------------------------------------------
// IterMut

/// Mutable iterator over the live objects of an
/// [`ObjectStorage`](super::ObjectStorage).
pub struct IterMut<'a, T, const PAGE_SIZE: usize> {
    storage: &'a PageStorage<T, PAGE_SIZE>,
    next_page: usize,
    remaining: usize,
    current: slice::IterMut<'a, T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, const PAGE_SIZE: usize> IterMut<'a, T, PAGE_SIZE> {
    #[inline]
    pub(super) fn new(storage: &'a mut PageStorage<T, PAGE_SIZE>, len: usize) -> Self {
        Self {
            storage,
            next_page: 0,
            remaining: len,
            current: slice::IterMut::default(),
            _marker: PhantomData,
        }
    }
}

impl<'a, T, const PAGE_SIZE: usize> Iterator for IterMut<'a, T, PAGE_SIZE> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.current.next() {
                return Some(object);
            }
            if self.remaining == 0 {
                return None;
            }

            let run = self.remaining.min(PAGE_SIZE);
            // SAFETY: The first `run` slots of the page are live, every page
            // is handed out once and the storage is borrowed mutably for 'a.
            self.current = unsafe { self.storage.page_slice_unbound(self.next_page, run) }.iter_mut();
            self.next_page += 1;
            self.remaining -= run;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.current.len() + self.remaining;
        (len, Some(len))
    }
}

impl<T, const PAGE_SIZE: usize> ExactSizeIterator for IterMut<'_, T, PAGE_SIZE> {}
impl<T, const PAGE_SIZE: usize> FusedIterator for IterMut<'_, T, PAGE_SIZE> {}
