use alloc::vec::Vec;
use core::any::type_name;
use core::fmt::Debug;

use super::{HandleFetcher, Handle32, Iter, IterMut};
use crate::page::{DEFAULT_PAGE_SIZE, PageStorage};
use crate::utils::DebugCheckedUnwrap;

/// Lookup entry of a logical slot that holds no object.
const VACANT: u32 = u32::MAX;

// -----------------------------------------------------------------------------
// MovedObject

/// Records the object moved by a compacting destroy.
///
/// After destroying dense index `to`, the last object (at `from`) is moved
/// into the hole. Owners that cache dense indices use this to patch them.
pub struct MovedObject<T> {
    /// The handle of the moved object, as reported by the fetcher.
    pub handle: Handle32<T>,
    /// Dense index before the move, the old `len() - 1`.
    pub from: usize,
    /// Dense index after the move, where the destroyed object was.
    pub to: usize,
}

impl<T> Clone for MovedObject<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MovedObject<T> {}

impl<T> PartialEq for MovedObject<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.from == other.from && self.to == other.to
    }
}

impl<T> Eq for MovedObject<T> {}

impl<T> Debug for MovedObject<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MovedObject")
            .field("handle", &self.handle)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ObjectStorage

/// Dense, paged storage of objects addressed by [`Handle32`].
///
/// Live objects always occupy the dense indices `0..len()` without holes,
/// spread over pages of `PAGE_SIZE` objects. Iteration is therefore a walk
/// over a few contiguous slices.
///
/// Handles stay stable while objects move: a handle names a logical slot,
/// and a lookup table maps the slot to the object's current dense index.
/// Destroying an object moves the last object into the hole, and the
/// [`HandleFetcher`] passed to the destroy tells the storage which slot to
/// patch for it.
///
/// Destroy never releases pages, call [`shrink_to_fit`](Self::shrink_to_fit)
/// for that.
pub struct ObjectStorage<T, const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    storage: PageStorage<T, PAGE_SIZE>,
    /// Logical slot -> dense index, `VACANT` for destroyed slots.
    lookup: Vec<u32>,
    /// Recycled logical slots.
    free: Vec<u32>,
    len: usize,
}

impl<T, const PAGE_SIZE: usize> ObjectStorage<T, PAGE_SIZE> {
    /// Creates an empty storage, no page is allocated.
    #[inline]
    pub const fn new() -> Self {
        Self {
            storage: PageStorage::new(),
            lookup: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Creates an empty storage with pages for at least `capacity` objects.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut this = Self::new();
        if capacity != 0 {
            this.storage.grow(capacity);
            this.lookup.reserve(capacity);
        }
        this
    }

    /// Returns the number of live objects.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of objects the allocated pages can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    #[inline(always)]
    pub fn page_count(&self) -> usize {
        self.storage.page_count()
    }

    /// Moves `value` to the end of the dense range and returns its handle,
    /// along with a reference to the stored object.
    ///
    /// Grows the storage by one page when the last page is full.
    pub fn create_object(&mut self, value: T) -> (Handle32<T>, &mut T) {
        #[cold]
        #[inline(never)]
        fn too_many_objects() -> ! {
            panic!("ObjectStorage cannot hold more than {} objects", VACANT - 1);
        }

        let dense = self.len;
        if dense >= (VACANT - 1) as usize {
            too_many_objects();
        }
        if dense == self.storage.capacity() {
            self.storage.grow(dense + 1);
        }

        // Slots beyond `free` are all in use, so a new one is `lookup.len()`.
        let slot = match self.free.pop() {
            Some(slot) => {
                self.lookup[slot as usize] = dense as u32;
                slot
            }
            None => {
                self.lookup.push(dense as u32);
                (self.lookup.len() - 1) as u32
            }
        };

        // SAFETY: `dense < capacity`, and slots past `len` are uninitialized.
        unsafe { self.storage.write(dense, value) };
        self.len += 1;

        // SAFETY: Just initialized.
        let object = unsafe { self.storage.get_mut(dense) };
        (Handle32::from_slot(slot), object)
    }

    /// Creates a default object, see [`create_object`](Self::create_object).
    #[inline]
    pub fn create_default(&mut self) -> (Handle32<T>, &mut T)
    where
        T: Default,
    {
        self.create_object(T::default())
    }

    /// Destroys the object behind `handle`, moving the last object into its
    /// place.
    ///
    /// # Panics
    /// Panics if `handle` does not refer to a live object, or if `fetcher`
    /// returns a handle that does not refer to the moved object.
    #[inline]
    pub fn destroy_object<F>(&mut self, handle: Handle32<T>, fetcher: &F)
    where
        F: HandleFetcher<T> + ?Sized,
    {
        let (value, _) = self.remove(handle, fetcher);
        drop(value);
    }

    /// Like [`destroy_object`](Self::destroy_object), and reports the object
    /// that was moved, if any.
    #[inline]
    pub fn destroy_object_tracked<F>(
        &mut self,
        handle: Handle32<T>,
        fetcher: &F,
    ) -> Option<MovedObject<T>>
    where
        F: HandleFetcher<T> + ?Sized,
    {
        let (value, moved) = self.remove(handle, fetcher);
        drop(value);
        moved
    }

    /// Like [`destroy_object_tracked`](Self::destroy_object_tracked), but
    /// returns the object instead of dropping it.
    #[inline]
    pub fn take_object<F>(&mut self, handle: Handle32<T>, fetcher: &F) -> (T, Option<MovedObject<T>>)
    where
        F: HandleFetcher<T> + ?Sized,
    {
        self.remove(handle, fetcher)
    }

    /// Removes the object behind `handle` and compacts the dense range.
    ///
    /// Bookkeeping is finished before `fetcher` runs, so a panicking fetcher
    /// leaves the moved object unreachable but the storage consistent.
    fn remove<F>(&mut self, handle: Handle32<T>, fetcher: &F) -> (T, Option<MovedObject<T>>)
    where
        F: HandleFetcher<T> + ?Sized,
    {
        #[cold]
        #[inline(never)]
        fn not_alive(raw: u32) -> ! {
            panic!("object handle {raw} does not refer to a live object");
        }

        #[cold]
        #[inline(never)]
        fn mismatched_fetcher(raw: u32, from: usize) -> ! {
            panic!("fetched handle {raw} does not refer to the object moved from {from}");
        }

        let Some(dense) = self.dense_index(handle) else {
            not_alive(handle.to_raw());
        };
        // SAFETY: `dense_index` rejects the null handle.
        let slot = unsafe { handle.slot().debug_checked_unwrap() };
        let last = self.len - 1;

        // SAFETY: `dense < len`, the slot is initialized.
        let value = unsafe { self.storage.read(dense) };
        if dense != last {
            // SAFETY: `last` is initialized, `dense` was just moved out.
            unsafe { self.storage.move_item(last, dense) };
        }

        self.len = last;
        self.lookup[slot] = VACANT;
        self.free.push(slot as u32);

        if dense == last {
            return (value, None);
        }

        // SAFETY: `dense < len` and holds the moved object.
        let moved = fetcher.fetch_handle(unsafe { self.storage.get(dense) });
        let entry = moved.slot().and_then(|slot| self.lookup.get_mut(slot));
        match entry {
            Some(entry) if *entry == last as u32 => *entry = dense as u32,
            _ => mismatched_fetcher(moved.to_raw(), last),
        }

        log::trace!(
            "ObjectStorage<{}>: moved {moved} from {last} to {dense}",
            type_name::<T>()
        );

        let moved = MovedObject {
            handle: moved,
            from: last,
            to: dense,
        };
        (value, Some(moved))
    }

    /// Returns the current dense index of the object behind `handle`.
    #[inline]
    pub fn dense_index(&self, handle: Handle32<T>) -> Option<usize> {
        let dense = *self.lookup.get(handle.slot()?)? as usize;
        // `VACANT` is never below `len`.
        (dense < self.len).then_some(dense)
    }

    /// Returns `true` if `handle` refers to a live object.
    #[inline]
    pub fn contains(&self, handle: Handle32<T>) -> bool {
        self.dense_index(handle).is_some()
    }

    /// Returns the object behind `handle`.
    ///
    /// `None` for the null handle, unknown slots and destroyed objects.
    #[inline]
    pub fn get_object(&self, handle: Handle32<T>) -> Option<&T> {
        let dense = self.dense_index(handle)?;
        // SAFETY: `dense < len`.
        Some(unsafe { self.storage.get(dense) })
    }

    #[inline]
    pub fn get_object_mut(&mut self, handle: Handle32<T>) -> Option<&mut T> {
        let dense = self.dense_index(handle)?;
        // SAFETY: `dense < len`.
        Some(unsafe { self.storage.get_mut(dense) })
    }

    /// Returns the object at dense index `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn at(&self, index: usize) -> &T {
        if index >= self.len {
            out_of_bounds(index, self.len);
        }
        // SAFETY: `index < len`.
        unsafe { self.storage.get(index) }
    }

    /// Mutable version of [`at`](Self::at).
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        if index >= self.len {
            out_of_bounds(index, self.len);
        }
        // SAFETY: `index < len`.
        unsafe { self.storage.get_mut(index) }
    }

    /// Yields `(page, run)` for every page holding live objects.
    #[inline]
    fn runs(&self) -> impl Iterator<Item = (usize, usize)> + use<T, PAGE_SIZE> {
        let len = self.len;
        (0..len.div_ceil(PAGE_SIZE)).map(move |page| (page, (len - page * PAGE_SIZE).min(PAGE_SIZE)))
    }

    /// Calls `f` on every live object, in dense order.
    #[inline]
    pub fn iterate(&self, mut f: impl FnMut(&T)) {
        self.iterate_batches(|batch| batch.iter().for_each(&mut f));
    }

    #[inline]
    pub fn iterate_mut(&mut self, mut f: impl FnMut(&mut T)) {
        self.iterate_batches_mut(|batch| batch.iter_mut().for_each(&mut f));
    }

    /// Calls `f` once per page with the live objects of that page.
    ///
    /// Every batch but the last holds `PAGE_SIZE` objects.
    pub fn iterate_batches(&self, mut f: impl FnMut(&[T])) {
        for (page, run) in self.runs() {
            // SAFETY: The first `run` slots of the page are live.
            f(unsafe { self.storage.page_slice(page, run) });
        }
    }

    pub fn iterate_batches_mut(&mut self, mut f: impl FnMut(&mut [T])) {
        for (page, run) in self.runs() {
            // SAFETY: The first `run` slots of the page are live.
            f(unsafe { self.storage.page_slice_mut(page, run) });
        }
    }

    /// Returns an iterator over the live objects, in dense order.
    #[inline]
    pub fn get_objects(&self) -> Iter<'_, T, PAGE_SIZE> {
        Iter::new(&self.storage, self.len)
    }

    #[inline]
    pub fn get_objects_mut(&mut self) -> IterMut<'_, T, PAGE_SIZE> {
        IterMut::new(&mut self.storage, self.len)
    }

    /// Releases the pages past the last live object, and the spare
    /// capacity of the bookkeeping tables.
    pub fn shrink_to_fit(&mut self) {
        self.storage.shrink(self.len);
        self.lookup.shrink_to_fit();
        self.free.shrink_to_fit();
    }

    /// Drops every object and forgets every handle. Pages are kept.
    pub fn clear(&mut self) {
        let len = core::mem::take(&mut self.len);
        self.lookup.clear();
        self.free.clear();
        // SAFETY: `0..len` was live, `len` is already reset.
        unsafe { self.storage.drop_prefix(len) };
    }
}

#[cold]
#[inline(never)]
fn out_of_bounds(index: usize, len: usize) -> ! {
    panic!("index out of bounds: the len is {len} but the index is {index}");
}

impl<T, const PAGE_SIZE: usize> Default for ObjectStorage<T, PAGE_SIZE> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const PAGE_SIZE: usize> Drop for ObjectStorage<T, PAGE_SIZE> {
    fn drop(&mut self) {
        let len = core::mem::take(&mut self.len);
        // SAFETY: `0..len` is live.
        unsafe { self.storage.drop_prefix(len) };
    }
}

impl<T: Debug, const PAGE_SIZE: usize> Debug for ObjectStorage<T, PAGE_SIZE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.get_objects()).finish()
    }
}

impl<'a, T, const PAGE_SIZE: usize> IntoIterator for &'a ObjectStorage<T, PAGE_SIZE> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, PAGE_SIZE>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.get_objects()
    }
}

impl<'a, T, const PAGE_SIZE: usize> IntoIterator for &'a mut ObjectStorage<T, PAGE_SIZE> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, PAGE_SIZE>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.get_objects_mut()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{MovedObject, ObjectStorage};
    use crate::object::Handle32;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Item {
        handle: Handle32<Item>,
        value: u32,
    }

    fn spawn<const N: usize>(storage: &mut ObjectStorage<Item, N>, value: u32) -> Handle32<Item> {
        let (handle, item) = storage.create_object(Item {
            handle: Handle32::NULL,
            value,
        });
        item.handle = handle;
        handle
    }

    fn fetch(item: &Item) -> Handle32<Item> {
        item.handle
    }

    fn values<const N: usize>(storage: &ObjectStorage<Item, N>) -> Vec<u32> {
        storage.get_objects().map(|item| item.value).collect()
    }

    #[test]
    fn new_allocates_nothing() {
        let storage = ObjectStorage::<Item>::new();
        assert_eq!(storage.page_count(), 0);
        assert!(storage.is_empty());

        let storage = ObjectStorage::<Item, 16>::with_capacity(40);
        assert_eq!(storage.page_count(), 3);
        assert_eq!(storage.capacity(), 48);
    }

    #[test]
    fn destroy_moves_last_into_hole() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 0);
        let _b = spawn(&mut storage, 1);
        let c = spawn(&mut storage, 2);

        let calls = Cell::new(0);
        let counting = |item: &Item| {
            calls.set(calls.get() + 1);
            item.handle
        };
        storage.destroy_object(a, &counting);

        assert_eq!(calls.get(), 1);
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.at(0).value, 2);
        assert_eq!(storage.dense_index(c), Some(0));
        assert_eq!(storage.get_object(c).map(|item| item.value), Some(2));
        assert_eq!(storage.get_object(a), None);
    }

    #[test]
    fn destroy_last_moves_nothing() {
        let mut storage = ObjectStorage::<Item>::new();
        let _a = spawn(&mut storage, 0);
        let b = spawn(&mut storage, 1);

        let calls = Cell::new(0);
        let counting = |item: &Item| {
            calls.set(calls.get() + 1);
            item.handle
        };
        assert_eq!(storage.destroy_object_tracked(b, &counting), None);
        assert_eq!(calls.get(), 0);
        assert_eq!(values(&storage), [0]);
    }

    #[test]
    fn tracked_destroy_reports_move() {
        let mut storage = ObjectStorage::<Item, 4>::new();
        let handles: Vec<_> = (0..6).map(|i| spawn(&mut storage, i)).collect();

        let moved = storage.destroy_object_tracked(handles[1], &fetch);
        assert_eq!(
            moved,
            Some(MovedObject {
                handle: handles[5],
                from: 5,
                to: 1,
            })
        );
        assert_eq!(values(&storage), [0, 5, 2, 3, 4]);
    }

    #[test]
    fn take_object_returns_value() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 10);
        let b = spawn(&mut storage, 20);

        let (item, moved) = storage.take_object(a, &fetch);
        assert_eq!(item.value, 10);
        assert_eq!(moved.map(|m| m.handle), Some(b));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn slots_are_recycled() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 0);
        let _b = spawn(&mut storage, 1);
        storage.destroy_object(a, &fetch);

        let c = spawn(&mut storage, 2);
        assert_eq!(c.slot(), a.slot());
        assert_eq!(storage.dense_index(c), Some(1));
    }

    #[test]
    fn recycled_slot_holds_newer_object() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 0);
        let b = spawn(&mut storage, 1);
        storage.destroy_object(a, &fetch);
        let c = spawn(&mut storage, 2);

        // The newest object sits under the smallest handle.
        assert!(c < b);
        assert_eq!(storage.get_object(c).map(|item| item.value), Some(2));
        assert_eq!(storage.get_object(b).map(|item| item.value), Some(1));
        assert_eq!(values(&storage), [1, 2]);
    }

    #[test]
    fn lookups_reject_bad_handles() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 0);

        assert_eq!(storage.get_object(Handle32::NULL), None);
        assert_eq!(storage.get_object(Handle32::from_slot(7)), None);
        assert!(storage.contains(a));

        storage.destroy_object(a, &fetch);
        assert!(!storage.contains(a));
        assert_eq!(storage.get_object_mut(a), None);
    }

    #[test]
    #[should_panic(expected = "does not refer to a live object")]
    fn double_destroy_panics() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 0);
        storage.destroy_object(a, &fetch);
        storage.destroy_object(a, &fetch);
    }

    #[test]
    #[should_panic(expected = "does not refer to the object moved")]
    fn wrong_fetcher_panics() {
        let mut storage = ObjectStorage::<Item>::new();
        let a = spawn(&mut storage, 0);
        let _b = spawn(&mut storage, 1);
        storage.destroy_object(a, &|_: &Item| Handle32::<Item>::NULL);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn at_past_len_panics() {
        let mut storage = ObjectStorage::<Item>::with_capacity(8);
        spawn(&mut storage, 0);
        let _ = storage.at(1);
    }

    #[test]
    fn grows_one_page_at_a_time() {
        let mut storage = ObjectStorage::<Item, 4>::new();
        for i in 0..5 {
            spawn(&mut storage, i);
        }
        assert_eq!(storage.page_count(), 2);
        assert_eq!(storage.capacity(), 8);
    }

    #[test]
    fn batches_follow_pages() {
        let mut storage = ObjectStorage::<Item, 4>::new();
        for i in 0..10 {
            spawn(&mut storage, i);
        }

        let mut sizes = Vec::new();
        storage.iterate_batches(|batch| sizes.push(batch.len()));
        assert_eq!(sizes, [4, 4, 2]);

        storage.iterate_batches_mut(|batch| {
            for item in batch {
                item.value *= 10;
            }
        });
        let mut sum = 0;
        storage.iterate(|item| sum += item.value);
        assert_eq!(sum, 450);
    }

    #[test]
    fn iterators_are_exact() {
        let mut storage = ObjectStorage::<Item, 4>::new();
        for i in 0..9 {
            spawn(&mut storage, i);
        }

        let mut iter = storage.get_objects();
        assert_eq!(iter.len(), 9);
        let _ = iter.nth(4);
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.count(), 4);

        for item in &mut storage {
            item.value += 1;
        }
        storage.iterate_mut(|item| item.value += 1);
        assert_eq!(values(&storage), [2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!((&storage).into_iter().len(), 9);
    }

    #[test]
    fn shrink_to_fit_releases_trailing_pages() {
        let mut storage = ObjectStorage::<Item, 4>::new();
        let handles: Vec<_> = (0..10).map(|i| spawn(&mut storage, i)).collect();
        for handle in &handles[..7] {
            storage.destroy_object(*handle, &fetch);
        }
        assert_eq!(storage.page_count(), 3);

        storage.shrink_to_fit();
        assert_eq!(storage.page_count(), 1);
        for handle in &handles[7..] {
            assert_eq!(storage.get_object(*handle).map(|item| item.handle), Some(*handle));
        }

        spawn(&mut storage, 99);
        assert_eq!(storage.len(), 4);
        assert_eq!(storage.page_count(), 1);
    }

    #[test]
    fn clear_and_drop_release_objects() {
        let marker = Rc::new(());
        let mut storage = ObjectStorage::<Rc<()>, 8>::new();
        let handles: Vec<_> = (0..20)
            .map(|_| storage.create_object(Rc::clone(&marker)).0)
            .collect();
        assert_eq!(Rc::strong_count(&marker), 21);

        storage.clear();
        assert_eq!(Rc::strong_count(&marker), 1);
        assert!(storage.is_empty());
        assert_eq!(storage.get_object(handles[0]), None);
        assert_eq!(storage.page_count(), 3);

        for _ in 0..5 {
            storage.create_default();
        }
        let _ = storage.create_object(Rc::clone(&marker));
        drop(storage);
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn zero_sized_objects() {
        let mut storage = ObjectStorage::<(), 8>::new();
        let handles: Vec<_> = (0..20).map(|_| storage.create_object(()).0).collect();
        storage.destroy_object(handles[3], &|_: &()| handles[19]);
        assert_eq!(storage.len(), 19);
        assert_eq!(storage.dense_index(handles[19]), Some(3));
    }

    #[cfg(feature = "std")]
    mod properties {
        use super::{Item, fetch, spawn};
        use crate::object::{Handle32, ObjectStorage};
        use alloc::collections::{BTreeMap, BTreeSet};
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn storage_stays_dense(ops in prop::collection::vec(any::<Option<usize>>(), 1..300)) {
                let mut storage = ObjectStorage::<Item, 8>::new();
                let mut model: BTreeMap<Handle32<Item>, u32> = BTreeMap::new();
                let mut next = 0_u32;

                for op in ops {
                    match op {
                        Some(pick) if !model.is_empty() => {
                            let handle = *model.keys().nth(pick % model.len()).unwrap();
                            let moved = storage.destroy_object_tracked(handle, &fetch);
                            model.remove(&handle);
                            if let Some(moved) = moved {
                                prop_assert_eq!(moved.from, storage.len());
                                prop_assert_eq!(storage.dense_index(moved.handle), Some(moved.to));
                            }
                        }
                        _ => {
                            let handle = spawn(&mut storage, next);
                            prop_assert!(model.insert(handle, next).is_none());
                            next += 1;
                        }
                    }

                    prop_assert_eq!(storage.len(), model.len());
                    prop_assert!(storage.capacity() >= storage.len());
                }

                for (handle, value) in &model {
                    let item = storage.get_object(*handle).unwrap();
                    prop_assert_eq!(item.value, *value);
                    prop_assert_eq!(item.handle, *handle);
                }

                // Values are unique, recycled slots put newer values under smaller handles.
                let dense: BTreeSet<u32> = storage.get_objects().map(|item| item.value).collect();
                let expected: BTreeSet<u32> = model.values().copied().collect();
                prop_assert_eq!(dense.len(), storage.len());
                prop_assert_eq!(dense, expected);
            }
        }
    }
}
