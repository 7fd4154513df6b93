//! This module provides the implementation of the handle allocator.
//!
//! # Overview
//!
//! - Slots live in up to [`MAX_POOLS`] pools. Pool `p` holds
//!   `FIRST_POOL_CAPACITY << p` slots, so every new pool doubles the capacity
//!   while the number of pools stays small enough for 4 bits of the id.
//! - Pool 0 is allocated up front, later pools only when the last one is full.
//!   Pools never move and are only released when the allocator drops.
//! - Freed slots are recycled before fresh ones. Every free bumps the slot's
//!   [`Version`], which is how stale handles are told apart from the new
//!   occupant.
//!
//! # Locking
//!
//! Allocation goes through `&self` and can run on many threads at once: the
//! free list and the pool cursor sit behind a [`SpinLock`], held only while a
//! slot id is reserved. The value is written afterwards, and the slot is
//! published by setting its `occupied` flag with release ordering.
//!
//! Freeing and mutable access need `&mut self`, so they cannot race with
//! allocation or with each other. Shared lookups only read a slot after
//! observing its `occupied` flag, which makes them safe to run concurrently
//! with allocation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::type_name;
use core::cell::UnsafeCell;
use core::fmt::Debug;
use core::iter::{Enumerate, FusedIterator};
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::{ptr, slice};

use vc_os::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, Ordering};
use vc_os::utils::SpinLock;

use crate::handle::{AllocError, Handle, HandleError, HandleId, Version};
use crate::utils::DebugCheckedUnwrap;

// -----------------------------------------------------------------------------
// Constants

/// Number of slots in pool 0.
pub const FIRST_POOL_CAPACITY: u32 = 1024;

/// Maximum number of pools, bounded by the pool bits of [`HandleId`].
pub const MAX_POOLS: u32 = HandleId::MAX_POOL + 1;

const _: () = {
    // The last pool must still fit in the index bits.
    assert!((FIRST_POOL_CAPACITY << (MAX_POOLS - 1)) - 1 <= HandleId::MAX_INDEX);
};

/// Returns the number of slots in pool `pool`.
#[inline(always)]
pub const fn pool_capacity(pool: u32) -> u32 {
    FIRST_POOL_CAPACITY << pool
}

/// Returns the number of slots in the first `pools` pools.
#[inline(always)]
const fn capacity_of_pools(pools: u32) -> u64 {
    FIRST_POOL_CAPACITY as u64 * ((1_u64 << pools) - 1)
}

// -----------------------------------------------------------------------------
// Slot

struct Slot<T> {
    version: AtomicU32,
    occupied: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    #[inline]
    const fn vacant() -> Self {
        Self {
            version: AtomicU32::new(Version::FIRST.get()),
            occupied: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    fn version(&self) -> Version {
        let raw = self.version.load(Ordering::Relaxed);
        // SAFETY: Versions are only ever stored from a `Version`.
        unsafe { Version::new(raw).debug_checked_unwrap() }
    }

    #[inline]
    fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }
}

// -----------------------------------------------------------------------------
// Pool

/// An atomic pointer to the slots of one pool.
/// The length is implied by the pool number, see [`pool_capacity`].
struct Pool<T> {
    head: AtomicPtr<Slot<T>>,
}

impl<T> Pool<T> {
    const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Allocates the slots of pool `pool`, all vacant at [`Version::FIRST`].
    ///
    /// Must be called at most once, while holding the allocation lock
    /// (or with exclusive access).
    #[cold]
    #[inline(never)]
    fn alloc(&self, pool: u32) {
        debug_assert!(self.head.load(Ordering::Relaxed).is_null());

        let slots: Box<[Slot<T>]> = (0..pool_capacity(pool)).map(|_| Slot::vacant()).collect();
        let head = Box::into_raw(slots).cast::<Slot<T>>();
        self.head.store(head, Ordering::Release);
    }

    /// Drops every occupied value and releases the slots.
    fn dealloc(&mut self, pool: u32) {
        let head = core::mem::replace(self.head.get_mut(), ptr::null_mut());
        if head.is_null() {
            return;
        }

        let len = pool_capacity(pool) as usize;
        // SAFETY: `head` came from `alloc` with this exact length.
        let mut slots = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(head, len)) };
        for slot in slots.iter_mut() {
            if *slot.occupied.get_mut() {
                // SAFETY: Occupied slots hold an initialized value.
                unsafe { slot.value.get_mut().assume_init_drop() };
            }
        }
    }

    #[inline]
    fn slots(&self, pool: u32) -> Option<&[Slot<T>]> {
        let head = self.head.load(Ordering::Acquire);
        if head.is_null() {
            return None;
        }
        // SAFETY: A non-null head always points to `pool_capacity(pool)` slots.
        Some(unsafe { slice::from_raw_parts(head, pool_capacity(pool) as usize) })
    }
}

// -----------------------------------------------------------------------------
// AllocState

/// The part of the allocator guarded by the spin lock.
struct AllocState {
    /// Recycled ids, reused last-in first-out.
    free: Vec<HandleId>,
    /// Number of allocated pools, at least 1.
    pool_count: u32,
    /// Next never-used index in the last pool.
    cursor: u32,
}

// -----------------------------------------------------------------------------
// HandleAllocator

/// Owns values of type `T` and hands out versioned [`Handle`]s to them.
///
/// See the [module documentation](self) for the pool layout and the
/// locking model.
///
/// # Examples
///
/// ```
/// use vc_store::handle::HandleAllocator;
///
/// let mut names = HandleAllocator::new();
/// let alice = names.alloc("alice");
/// assert_eq!(names.get(alice), Some(&"alice"));
///
/// assert_eq!(names.free(alice), Ok("alice"));
/// let bob = names.alloc("bob");
///
/// // Same slot, new version: the old handle no longer resolves.
/// assert_eq!(alice.id(), bob.id());
/// assert_eq!(names.get(alice), None);
/// ```
pub struct HandleAllocator<T> {
    pools: [Pool<T>; MAX_POOLS as usize],
    state: SpinLock<AllocState>,
    len: AtomicU32,
    _marker: PhantomData<*mut T>,
}

// SAFETY: The allocator owns its values.
unsafe impl<T: Send> Send for HandleAllocator<T> {}
// SAFETY: `&self` can move values in (`alloc`) and hand out `&T` (`get`).
unsafe impl<T: Send + Sync> Sync for HandleAllocator<T> {}

impl<T> HandleAllocator<T> {
    /// Creates an allocator with pool 0 already allocated.
    pub fn new() -> Self {
        let allocator = Self {
            pools: [const { Pool::new() }; MAX_POOLS as usize],
            state: SpinLock::new(AllocState {
                free: Vec::new(),
                pool_count: 1,
                cursor: 0,
            }),
            len: AtomicU32::new(0),
            _marker: PhantomData,
        };
        allocator.pools[0].alloc(0);
        allocator
    }

    /// Returns the number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed) as usize
    }

    /// Returns `true` if no value is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of allocated pools.
    pub fn pool_count(&self) -> u32 {
        // Pools are allocated in order, the first null head ends the list.
        self.pools
            .iter()
            .take_while(|pool| !pool.head.load(Ordering::Acquire).is_null())
            .count() as u32
    }

    /// Returns the number of slots in all allocated pools.
    #[inline]
    pub fn capacity(&self) -> u64 {
        capacity_of_pools(self.pool_count())
    }

    /// Reserves a slot id: recycled first, then the last pool's cursor,
    /// then a new pool.
    fn reserve(pools: &[Pool<T>], state: &mut AllocState) -> Result<HandleId, AllocError> {
        if let Some(id) = state.free.pop() {
            return Ok(id);
        }

        let mut pool = state.pool_count - 1;
        if state.cursor == pool_capacity(pool) {
            if state.pool_count == MAX_POOLS {
                return Err(AllocError::PoolsExhausted {
                    pools: MAX_POOLS,
                    capacity: capacity_of_pools(MAX_POOLS),
                });
            }

            pool = state.pool_count;
            pools[pool as usize].alloc(pool);
            state.pool_count += 1;
            state.cursor = 0;

            log::debug!(
                "HandleAllocator<{}> allocated pool {pool} ({} slots)",
                type_name::<T>(),
                pool_capacity(pool),
            );
        }

        let index = state.cursor;
        state.cursor += 1;
        Ok(HandleId::new(pool, index))
    }

    /// Moves `value` into the reserved slot `id` and publishes it.
    #[inline]
    fn publish(&self, id: HandleId, value: T) -> Handle<T> {
        // SAFETY: `id` was just reserved, so its pool is allocated and no
        // one else reads or writes the value until it is published.
        unsafe {
            let slot = self.slot(id).debug_checked_unwrap();
            (*slot.value.get()).write(value);
            let version = slot.version();
            slot.occupied.store(true, Ordering::Release);
            self.len.fetch_add(1, Ordering::Relaxed);
            Handle::new(id, version)
        }
    }

    /// Moves `value` into a free slot and returns its handle.
    ///
    /// Returns [`Handle::NULL`] (and drops `value`) when every pool is full.
    /// This is the only recoverable failure, callers that can hit it must
    /// check [`Handle::is_null`].
    pub fn alloc(&self, value: T) -> Handle<T> {
        match self.try_alloc(value) {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("HandleAllocator<{}>: {err}", type_name::<T>());
                Handle::NULL
            }
        }
    }

    /// Like [`alloc`](Self::alloc), but reports exhaustion as an error.
    ///
    /// `value` is dropped on failure.
    #[inline]
    pub fn try_alloc(&self, value: T) -> Result<Handle<T>, AllocError> {
        self.try_alloc_with(move || value)
    }

    /// Reserves a slot first and only then builds the value with `f`.
    ///
    /// A panic in `f` leaks the reserved slot.
    pub fn try_alloc_with(&self, f: impl FnOnce() -> T) -> Result<Handle<T>, AllocError> {
        let id = {
            let mut state = self.state.lock();
            Self::reserve(&self.pools, &mut state)?
        };
        Ok(self.publish(id, f()))
    }

    /// Like [`alloc`](Self::alloc), but skips the lock thanks to `&mut self`.
    pub fn alloc_mut(&mut self, value: T) -> Handle<T> {
        match Self::reserve(&self.pools, self.state.get_mut()) {
            Ok(id) => self.publish(id, value),
            Err(err) => {
                log::warn!("HandleAllocator<{}>: {err}", type_name::<T>());
                Handle::NULL
            }
        }
    }

    #[inline]
    fn slot(&self, id: HandleId) -> Option<&Slot<T>> {
        let pool = id.pool();
        self.pools[pool as usize]
            .slots(pool)?
            .get(id.index() as usize)
    }

    /// Resolves a handle to its slot, checking every way it can be wrong.
    fn check(&self, handle: Handle<T>) -> Result<(HandleId, &Slot<T>), HandleError> {
        let id = handle.id().ok_or(HandleError::Null)?;
        let slot = self.slot(id).ok_or(HandleError::OutOfRange(id))?;
        if !slot.is_occupied() {
            return Err(HandleError::Vacant(id));
        }
        let current = slot.version();
        if current != handle.version() {
            return Err(HandleError::Stale {
                id,
                version: handle.version(),
                current,
            });
        }
        Ok((id, slot))
    }

    /// Frees the value behind `handle` and returns it.
    ///
    /// The slot's version is bumped, so `handle` and every copy of it go
    /// stale, and the slot becomes available to the next allocation.
    pub fn free(&mut self, handle: Handle<T>) -> Result<T, HandleError> {
        let (id, value) = {
            let (id, slot) = self.check(handle)?;
            let (next, wrapped) = slot.version().bump();
            if wrapped {
                log::warn!(
                    "HandleAllocator<{}>: version of slot {id} wrapped, aliasing may occur.",
                    type_name::<T>()
                );
            }
            slot.version.store(next.get(), Ordering::Relaxed);
            slot.occupied.store(false, Ordering::Relaxed);
            // SAFETY: The slot was occupied and `&mut self` excludes readers.
            (id, unsafe { (*slot.value.get()).assume_init_read() })
        };

        self.state.get_mut().free.push(id);
        *self.len.get_mut() -= 1;
        Ok(value)
    }

    /// Returns the value behind `handle` if it is still live.
    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let (_, slot) = self.check(handle).ok()?;
        // SAFETY: Checked occupied, and freeing needs `&mut self`.
        Some(unsafe { (*slot.value.get()).assume_init_ref() })
    }

    /// Returns the value behind `handle` mutably if it is still live.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let (_, slot) = self.check(handle).ok()?;
        // SAFETY: Checked occupied, and `&mut self` is exclusive.
        Some(unsafe { (*slot.value.get()).assume_init_mut() })
    }

    /// Resolves `handle` to its slot without looking at occupancy or version.
    #[inline]
    fn raw_slot(&self, handle: Handle<T>) -> &Slot<T> {
        #[cold]
        #[inline(never)]
        fn invalid_handle(raw_id: u32) -> ! {
            panic!("handle id {raw_id:#x} does not address an allocated slot")
        }

        let Some(slot) = handle.id().and_then(|id| self.slot(id)) else {
            invalid_handle(handle.raw_id());
        };
        debug_assert!(slot.is_occupied(), "unchecked access to a vacant slot");
        slot
    }

    /// Returns the value in the slot addressed by `handle`, ignoring its version.
    ///
    /// # Panics
    /// Panics if `handle` is null or does not address an allocated slot.
    ///
    /// # Safety
    /// The slot must be occupied. If the handle is stale, the returned value
    /// belongs to whoever occupies the slot now.
    #[inline]
    pub unsafe fn get_unchecked(&self, handle: Handle<T>) -> &T {
        let slot = self.raw_slot(handle);
        // SAFETY: Ensured by caller.
        unsafe { (*slot.value.get()).assume_init_ref() }
    }

    /// Mutable version of [`get_unchecked`](Self::get_unchecked).
    ///
    /// # Panics
    /// Panics if `handle` is null or does not address an allocated slot.
    ///
    /// # Safety
    /// Same as [`get_unchecked`](Self::get_unchecked).
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, handle: Handle<T>) -> &mut T {
        let slot = self.raw_slot(handle);
        // SAFETY: Ensured by caller, and `&mut self` is exclusive.
        unsafe { (*slot.value.get()).assume_init_mut() }
    }

    /// Returns the version currently stored in the slot addressed by `handle`.
    ///
    /// `None` if the handle is null or out of range. The slot may be vacant.
    #[inline]
    pub fn version_of(&self, handle: Handle<T>) -> Option<Version> {
        Some(self.slot(handle.id()?)?.version())
    }

    /// Returns `true` if `handle` refers to a live value.
    #[inline]
    pub fn is_alive(&self, handle: Handle<T>) -> bool {
        self.check(handle).is_ok()
    }

    /// Iterates over the live values and their handles, in slot order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            allocator: self,
            pool: 0,
            slots: <&[Slot<T>]>::default().iter().enumerate(),
        }
    }
}

impl<T> Default for HandleAllocator<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for HandleAllocator<T> {
    fn drop(&mut self) {
        for (index, pool) in self.pools.iter_mut().enumerate() {
            pool.dealloc(index as u32);
        }
    }
}

impl<T> Debug for HandleAllocator<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandleAllocator")
            .field("len", &self.len())
            .field("pools", &self.pool_count())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a HandleAllocator<T> {
    type Item = (Handle<T>, &'a T);
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// -----------------------------------------------------------------------------
// Iter

/// Iterator over the live values of a [`HandleAllocator`].
///
/// Values allocated concurrently may or may not be observed.
pub struct Iter<'a, T> {
    allocator: &'a HandleAllocator<T>,
    /// The pool after the one `slots` walks.
    pool: u32,
    slots: Enumerate<slice::Iter<'a, Slot<T>>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle<T>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for (index, slot) in self.slots.by_ref() {
                if slot.is_occupied() {
                    let id = HandleId::new(self.pool - 1, index as u32);
                    // SAFETY: Observed occupied with acquire ordering.
                    let value = unsafe { (*slot.value.get()).assume_init_ref() };
                    return Some((Handle::new(id, slot.version()), value));
                }
            }

            if self.pool == MAX_POOLS {
                return None;
            }
            let Some(slots) = self.allocator.pools[self.pool as usize].slots(self.pool) else {
                self.pool = MAX_POOLS;
                return None;
            };
            self.slots = slots.iter().enumerate();
            self.pool += 1;
        }
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

// -----------------------------------------------------------------------------
// Tests
