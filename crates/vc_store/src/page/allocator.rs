use alloc::alloc as malloc;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::num::NonZeroUsize;
use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Constants

/// Alignment of every page, in bytes.
pub const PAGE_ALIGN: usize = 16;

/// Number of elements per page when no size is given.
pub const DEFAULT_PAGE_SIZE: usize = 64;

/// Dangling, page-aligned address used for pages of zero-sized elements.
const DANGLING_PAGE: NonNull<u8> =
    NonNull::without_provenance(NonZeroUsize::new(PAGE_ALIGN).unwrap());

// -----------------------------------------------------------------------------
// PageAllocator

/// A growable set of fixed-capacity raw memory pages.
///
/// Each page holds `PAGE_SIZE` elements of `element_size` bytes and is one
/// heap block aligned to [`PAGE_ALIGN`]. Pages are appended by
/// [`grow`](Self::grow) and removed from the tail by [`shrink`](Self::shrink),
/// so the address of a flat index never changes while its page exists.
///
/// The allocator knows nothing about what lives in the pages: it never reads,
/// initializes, or drops elements.
pub struct PageAllocator<const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    element_size: usize,
    pages: Vec<NonNull<u8>>,
}

// SAFETY: The pages are uniquely owned heap blocks, and the allocator
// exposes them only as raw addresses.
unsafe impl<const PAGE_SIZE: usize> Send for PageAllocator<PAGE_SIZE> {}
unsafe impl<const PAGE_SIZE: usize> Sync for PageAllocator<PAGE_SIZE> {}

impl<const PAGE_SIZE: usize> PageAllocator<PAGE_SIZE> {
    const _STATIC_ASSERT_: () = const {
        assert!(PAGE_SIZE > 0, "page size must not be zero");
    };

    /// Creates an allocator for elements of `element_size` bytes.
    ///
    /// No memory is allocated until the first [`grow`](Self::grow).
    #[inline]
    pub const fn new(element_size: usize) -> Self {
        let () = Self::_STATIC_ASSERT_;
        Self {
            element_size,
            pages: Vec::new(),
        }
    }

    /// Returns the size of one element in bytes.
    #[inline(always)]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Returns the size of one page in bytes, rounded up to [`PAGE_ALIGN`].
    ///
    /// # Panics
    /// Panics if a page would not fit in `isize`.
    #[inline]
    pub fn page_bytes(&self) -> usize {
        self.page_layout().size()
    }

    /// Returns the number of allocated pages.
    #[inline(always)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the number of elements the allocated pages can address.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.pages.len() * PAGE_SIZE
    }

    /// Returns the number of bytes currently held by pages.
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.pages.len() * self.page_bytes()
    }

    /// Splits a flat index into `(page, offset_in_page)`.
    #[inline(always)]
    pub const fn locate(index: usize) -> (usize, usize) {
        (index / PAGE_SIZE, index % PAGE_SIZE)
    }

    #[inline]
    fn page_layout(&self) -> Layout {
        #[cold]
        #[inline(never)]
        fn invalid_size(page_size: usize, element_size: usize) -> ! {
            panic!("page of {page_size} elements of {element_size} bytes overflows `isize`");
        }

        let Some(bytes) = PAGE_SIZE.checked_mul(self.element_size) else {
            invalid_size(PAGE_SIZE, self.element_size);
        };
        Layout::from_size_align(bytes, PAGE_ALIGN)
            .unwrap_or_else(|_| invalid_size(PAGE_SIZE, self.element_size))
            .pad_to_align()
    }

    /// Makes sure enough pages exist to address `count` elements.
    ///
    /// Only the missing pages are allocated, existing pages are untouched.
    /// The new pages are uninitialized.
    ///
    /// `count` must not be zero.
    pub fn grow(&mut self, count: usize) {
        debug_assert!(count != 0, "`PageAllocator::grow` called with a zero count");

        let required = count.div_ceil(PAGE_SIZE);
        let current = self.pages.len();
        if required <= current {
            return;
        }

        let layout = self.page_layout();
        self.pages.reserve(required - current);
        for _ in current..required {
            let page = if layout.size() == 0 {
                DANGLING_PAGE
            } else {
                // SAFETY: `layout` has a non-zero size.
                NonNull::new(unsafe { malloc::alloc(layout) })
                    .unwrap_or_else(|| malloc::handle_alloc_error(layout))
            };
            self.pages.push(page);
        }

        log::debug!(
            "PageAllocator grew from {current} to {required} pages ({} bytes each)",
            layout.size()
        );
    }

    /// Releases trailing pages that are not needed to address `count` elements.
    ///
    /// `count` is clamped to [`capacity`](Self::capacity). Elements still
    /// living in released pages are the caller's responsibility, they are not
    /// dropped.
    pub fn shrink(&mut self, count: usize) {
        let count = count.min(self.capacity());
        let required = count.div_ceil(PAGE_SIZE);
        let current = self.pages.len();
        if required >= current {
            return;
        }

        let layout = self.page_layout();
        for page in self.pages.drain(required..) {
            if layout.size() != 0 {
                // SAFETY: The page was allocated in `grow` with this layout.
                unsafe { malloc::dealloc(page.as_ptr(), layout) };
            }
        }

        log::debug!("PageAllocator shrank from {current} to {required} pages");
    }

    /// Returns the start address of page `page`.
    ///
    /// # Panics
    /// Panics if `page >= self.page_count()`.
    #[inline]
    pub fn page_address(&self, page: usize) -> NonNull<u8> {
        self.pages[page]
    }

    /// Returns the address of the element at flat index `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.capacity()`.
    #[inline]
    pub fn address(&self, index: usize) -> NonNull<u8> {
        let (page, offset) = Self::locate(index);
        let base = self.page_address(page);
        // SAFETY: `offset < PAGE_SIZE`, so the result stays inside the page.
        unsafe { base.byte_add(offset * self.element_size) }
    }
}

impl<const PAGE_SIZE: usize> Drop for PageAllocator<PAGE_SIZE> {
    fn drop(&mut self) {
        self.shrink(0);
    }
}

impl<const PAGE_SIZE: usize> Debug for PageAllocator<PAGE_SIZE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PageAllocator")
            .field("page_size", &PAGE_SIZE)
            .field("element_size", &self.element_size)
            .field("pages", &self.pages.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{PAGE_ALIGN, PageAllocator};
    use alloc::vec::Vec;

    #[test]
    fn no_allocation_until_grow() {
        let pages = PageAllocator::<64>::new(16);
        assert_eq!(pages.page_count(), 0);
        assert_eq!(pages.capacity(), 0);
        assert_eq!(pages.allocated_bytes(), 0);
    }

    #[test]
    fn grow_and_shrink_by_page() {
        let mut pages = PageAllocator::<64>::new(16);

        pages.grow(70);
        assert_eq!(pages.page_count(), 2);
        assert_eq!(pages.capacity(), 128);

        pages.shrink(65);
        assert_eq!(pages.page_count(), 2);

        pages.shrink(64);
        assert_eq!(pages.page_count(), 1);

        pages.shrink(0);
        assert_eq!(pages.page_count(), 0);
    }

    #[test]
    fn grow_never_shrinks() {
        let mut pages = PageAllocator::<8>::new(4);
        pages.grow(33);
        assert_eq!(pages.page_count(), 5);
        pages.grow(1);
        assert_eq!(pages.page_count(), 5);
    }

    #[test]
    fn shrink_clamps_to_capacity() {
        let mut pages = PageAllocator::<8>::new(4);
        pages.grow(16);
        pages.shrink(1000);
        assert_eq!(pages.page_count(), 2);
    }

    #[test]
    fn page_bytes_are_aligned() {
        assert_eq!(PageAllocator::<64>::new(16).page_bytes(), 1024);
        assert_eq!(PageAllocator::<3>::new(5).page_bytes(), 16);
        assert_eq!(PageAllocator::<7>::new(3).page_bytes(), 32);
    }

    #[test]
    fn address_layout() {
        let mut pages = PageAllocator::<64>::new(12);
        pages.grow(200);

        for page in 0..pages.page_count() {
            assert_eq!(pages.page_address(page).as_ptr() as usize % PAGE_ALIGN, 0);
        }
        for index in 0..200 {
            let (page, offset) = PageAllocator::<64>::locate(index);
            let base = pages.page_address(page).as_ptr() as usize;
            assert_eq!(pages.address(index).as_ptr() as usize, base + offset * 12);
            assert_eq!(pages.address(index), pages.address(index));
        }
    }

    #[test]
    fn shrink_keeps_leading_addresses() {
        let mut pages = PageAllocator::<16>::new(8);
        pages.grow(100);
        let before: Vec<_> = (0..40).map(|i| pages.address(i)).collect();

        pages.shrink(40);
        assert_eq!(pages.page_count(), 3);
        let after: Vec<_> = (0..40).map(|i| pages.address(i)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn bytes_round_trip_across_pages() {
        let mut pages = PageAllocator::<4>::new(8);
        pages.grow(20);

        for index in 0..20_u64 {
            let ptr = pages.address(index as usize).cast::<u64>();
            unsafe { ptr.write(index * 0x0101_0101) };
        }
        for index in 0..20_u64 {
            let ptr = pages.address(index as usize).cast::<u64>();
            assert_eq!(unsafe { ptr.read() }, index * 0x0101_0101);
        }
    }

    #[test]
    fn zero_sized_elements() {
        let mut pages = PageAllocator::<64>::new(0);
        pages.grow(1000);
        assert_eq!(pages.page_count(), 16);
        assert_eq!(pages.allocated_bytes(), 0);
        assert_eq!(pages.address(999).as_ptr() as usize % PAGE_ALIGN, 0);
    }

    #[test]
    #[should_panic(expected = "overflows `isize`")]
    fn oversized_page_is_rejected() {
        let pages = PageAllocator::<64>::new(usize::MAX / 32);
        let _ = pages.page_bytes();
    }

    #[test]
    #[should_panic(expected = "overflows `isize`")]
    fn page_past_isize_is_rejected() {
        let mut pages = PageAllocator::<2>::new(isize::MAX as usize / 2 + 1);
        pages.grow(1);
    }

    #[test]
    #[should_panic]
    fn address_out_of_range() {
        let mut pages = PageAllocator::<64>::new(4);
        pages.grow(10);
        let _ = pages.address(64);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "zero count")]
    fn grow_zero_is_a_caller_error() {
        let mut pages = PageAllocator::<64>::new(4);
        pages.grow(0);
    }

    #[cfg(feature = "std")]
    mod properties {
        use super::super::{PAGE_ALIGN, PageAllocator};
        use alloc::vec::Vec;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn shrink_keeps_prefix(grow in 1_usize..600, keep in 0_usize..600, size in 1_usize..40) {
                let mut pages = PageAllocator::<16>::new(size);
                pages.grow(grow);
                let before: Vec<_> = (0..grow).map(|i| pages.address(i)).collect();
                for (i, address) in before.iter().enumerate() {
                    let (page, offset) = PageAllocator::<16>::locate(i);
                    let base = pages.page_address(page).as_ptr() as usize;
                    prop_assert_eq!(base % PAGE_ALIGN, 0);
                    prop_assert_eq!(address.as_ptr() as usize, base + offset * size);
                }

                let keep = keep.min(grow);
                pages.shrink(keep);
                prop_assert_eq!(pages.page_count(), keep.div_ceil(16));
                for (i, address) in before.iter().enumerate().take(keep) {
                    prop_assert_eq!(pages.address(i), *address);
                }
            }
        }
    }
}
