use core::fmt::Debug;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use core::slice;

use super::{DEFAULT_PAGE_SIZE, PAGE_ALIGN, PageAllocator};

// -----------------------------------------------------------------------------
// PageStorage

/// A typed view over a [`PageAllocator`].
///
/// Slot `i` lives in page `i / PAGE_SIZE`, so the first `PAGE_SIZE` slots of
/// every page are contiguous and can be handed out as one slice.
///
/// `PageStorage` does not track which slots are initialized. Every accessor
/// is `unsafe` and relies on the owner to only touch live slots, and the
/// owner must drop live values before the storage is dropped.
pub struct PageStorage<T, const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    pages: PageAllocator<PAGE_SIZE>,
    _marker: PhantomData<T>,
}

impl<T, const PAGE_SIZE: usize> PageStorage<T, PAGE_SIZE> {
    const _STATIC_ASSERT_: () = const {
        assert!(
            align_of::<T>() <= PAGE_ALIGN,
            "element alignment exceeds the page alignment"
        );
    };

    /// Creates an empty storage, no page is allocated.
    #[inline]
    pub const fn new() -> Self {
        let () = Self::_STATIC_ASSERT_;
        Self {
            pages: PageAllocator::new(size_of::<T>()),
            _marker: PhantomData,
        }
    }

    /// Returns the number of slots the allocated pages can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.pages.capacity()
    }

    /// Returns the number of allocated pages.
    #[inline(always)]
    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    /// Returns the underlying untyped allocator.
    #[inline(always)]
    pub fn pages(&self) -> &PageAllocator<PAGE_SIZE> {
        &self.pages
    }

    /// See [`PageAllocator::grow`].
    #[inline]
    pub fn grow(&mut self, count: usize) {
        self.pages.grow(count);
    }

    /// See [`PageAllocator::shrink`].
    ///
    /// Values living in released pages are leaked, not dropped.
    #[inline]
    pub fn shrink(&mut self, count: usize) {
        self.pages.shrink(count);
    }

    /// Returns a pointer to slot `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.capacity()`.
    #[inline(always)]
    pub fn ptr(&self, index: usize) -> NonNull<T> {
        self.pages.address(index).cast()
    }

    /// # Safety
    /// - `index` must be within capacity.
    /// - The slot must be initialized.
    #[inline(always)]
    pub unsafe fn get(&self, index: usize) -> &T {
        unsafe { self.ptr(index).as_ref() }
    }

    /// # Safety
    /// - `index` must be within capacity.
    /// - The slot must be initialized.
    #[inline(always)]
    pub unsafe fn get_mut(&mut self, index: usize) -> &mut T {
        unsafe { self.ptr(index).as_mut() }
    }

    /// Moves `value` into slot `index` without dropping the previous content.
    ///
    /// # Safety
    /// - `index` must be within capacity.
    /// - The slot must be uninitialized (or its value already moved out).
    #[inline(always)]
    pub unsafe fn write(&mut self, index: usize, value: T) {
        unsafe { self.ptr(index).write(value) }
    }

    /// Moves the value out of slot `index`, leaving it logically uninitialized.
    ///
    /// # Safety
    /// - `index` must be within capacity.
    /// - The slot must be initialized.
    #[inline(always)]
    #[must_use = "The value moved out of the slot should be used or dropped"]
    pub unsafe fn read(&mut self, index: usize) -> T {
        unsafe { self.ptr(index).read() }
    }

    /// Moves the value in slot `from` into slot `to`, leaving `from`
    /// logically uninitialized.
    ///
    /// # Safety
    /// - Both indices must be within capacity and differ.
    /// - `from` must be initialized and `to` must be uninitialized.
    #[inline]
    pub unsafe fn move_item(&mut self, from: usize, to: usize) {
        debug_assert_ne!(from, to);
        let src = self.ptr(from);
        let dst = self.ptr(to);
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), 1) }
    }

    /// Drops the values in slots `0..len`.
    ///
    /// # Safety
    /// - `len` must be within capacity.
    /// - Slots `0..len` must be initialized, they are uninitialized afterwards.
    pub unsafe fn drop_prefix(&mut self, len: usize) {
        if !core::mem::needs_drop::<T>() {
            return;
        }
        let mut remaining = len;
        let mut page = 0;
        while remaining > 0 {
            let run = remaining.min(PAGE_SIZE);
            let base = self.pages.page_address(page).cast::<T>();
            let run_slice = ptr::slice_from_raw_parts_mut(base.as_ptr(), run);
            unsafe { ptr::drop_in_place(run_slice) };
            remaining -= run;
            page += 1;
        }
    }

    /// Returns the first `len` slots of page `page` as a slice.
    ///
    /// # Safety
    /// - `page` must be allocated and `len <= PAGE_SIZE`.
    /// - The first `len` slots of the page must be initialized.
    #[inline]
    pub unsafe fn page_slice(&self, page: usize, len: usize) -> &[T] {
        debug_assert!(len <= PAGE_SIZE);
        let base = self.pages.page_address(page).cast::<T>();
        unsafe { slice::from_raw_parts(base.as_ptr(), len) }
    }

    /// Mutable version of [`page_slice`](Self::page_slice).
    ///
    /// # Safety
    /// Same as [`page_slice`](Self::page_slice).
    #[inline]
    pub unsafe fn page_slice_mut(&mut self, page: usize, len: usize) -> &mut [T] {
        unsafe { self.page_slice_unbound(page, len) }
    }

    /// Mutable page slice with an unbound lifetime, used by iterators that
    /// hand out disjoint pages one after the other.
    ///
    /// # Safety
    /// Same as [`page_slice`](Self::page_slice), and the caller must make
    /// sure no other reference to the same page exists while the slice lives.
    #[inline]
    pub(crate) unsafe fn page_slice_unbound<'a>(&self, page: usize, len: usize) -> &'a mut [T] {
        debug_assert!(len <= PAGE_SIZE);
        let base = self.pages.page_address(page).cast::<T>();
        unsafe { slice::from_raw_parts_mut(base.as_ptr(), len) }
    }
}

impl<T, const PAGE_SIZE: usize> Default for PageStorage<T, PAGE_SIZE> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const PAGE_SIZE: usize> Debug for PageStorage<T, PAGE_SIZE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PageStorage")
            .field("type", &core::any::type_name::<T>())
            .field("pages", &self.pages)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::PageStorage;
    use alloc::rc::Rc;
    use alloc::string::{String, ToString};

    #[test]
    fn write_read_across_pages() {
        let mut storage = PageStorage::<String, 4>::new();
        storage.grow(10);
        assert_eq!(storage.page_count(), 3);

        for i in 0..10 {
            unsafe { storage.write(i, i.to_string()) };
        }
        for i in 0..10 {
            assert_eq!(unsafe { storage.get(i) }, &i.to_string());
        }

        let run = unsafe { storage.page_slice(1, 4) };
        assert_eq!(run, ["4", "5", "6", "7"]);

        for i in 0..10 {
            let value = unsafe { storage.read(i) };
            assert_eq!(value, i.to_string());
        }
    }

    #[test]
    fn move_item_relocates() {
        let mut storage = PageStorage::<String, 2>::new();
        storage.grow(3);
        unsafe {
            storage.write(0, "a".to_string());
            storage.write(2, "c".to_string());
            let a = storage.read(0);
            storage.move_item(2, 0);
            assert_eq!(a, "a");
            assert_eq!(storage.get(0), "c");
            storage.drop_prefix(1);
        }
    }

    #[test]
    fn drop_prefix_drops_each_value_once() {
        let marker = Rc::new(());
        let mut storage = PageStorage::<Rc<()>, 4>::new();
        storage.grow(9);
        for i in 0..9 {
            unsafe { storage.write(i, Rc::clone(&marker)) };
        }
        assert_eq!(Rc::strong_count(&marker), 10);

        unsafe { storage.drop_prefix(9) };
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn over_aligned_is_supported_up_to_page_align() {
        #[repr(align(16))]
        struct Wide(#[allow(dead_code)] u8);

        let mut storage = PageStorage::<Wide, 3>::new();
        storage.grow(7);
        for i in 0..7 {
            assert_eq!(storage.ptr(i).as_ptr() as usize % 16, 0);
        }
    }
}
