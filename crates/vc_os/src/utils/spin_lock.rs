#![expect(unsafe_code, reason = "SpinLock hands out references into an UnsafeCell.")]

use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use crate::sync::atomic::AtomicBool;
use crate::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use crate::utils::Backoff;

// -----------------------------------------------------------------------------
// SpinLock

/// A mutual exclusion primitive that busy-waits instead of parking.
///
/// Intended for very short critical sections, such as popping a free list
/// or bumping a cursor, where parking a thread would cost more than the
/// work being protected.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use vc_os::utils::SpinLock;
///
/// let counter = SpinLock::new(0_u32);
///
/// thread::scope(|s| {
///     for _ in 0..8 {
///         s.spawn(|| *counter.lock() += 1);
///     }
/// });
///
/// assert_eq!(counter.into_inner(), 8);
/// ```
pub struct SpinLock<T: ?Sized> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Send for SpinLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Creates an unlocked spin-lock.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Consumes the lock, returning the protected value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> SpinLock<T> {
    #[inline]
    fn acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Acquire, Relaxed)
            .is_ok()
    }

    /// Acquires the lock, spinning with exponential backoff until it is free.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let backoff = Backoff::new();
        while !self.acquire() {
            // Wait on a plain load so the cache line is not bounced by CAS.
            while self.locked.load(Relaxed) {
                backoff.snooze();
            }
        }
        SpinLockGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    /// Attempts to acquire the lock without waiting.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_ok()
            .then(|| SpinLockGuard {
                lock: self,
                _marker: PhantomData,
            })
    }

    /// Returns `true` if some guard currently holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Relaxed)
    }

    /// Returns a mutable reference to the protected value.
    ///
    /// No locking is needed, `&mut self` already proves exclusivity.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Default> Default for SpinLock<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SpinLock");
        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// SpinLockGuard

/// RAII guard of a [`SpinLock`], the lock is released on drop.
pub struct SpinLockGuard<'a, T: ?Sized + 'a> {
    lock: &'a SpinLock<T>,
    _marker: PhantomData<*mut ()>,
}

// A guard hands out `&mut T` where it lives and `&T` where it is shared.
unsafe impl<T: ?Sized + Send> Send for SpinLockGuard<'_, T> {}
unsafe impl<T: ?Sized + Sync> Sync for SpinLockGuard<'_, T> {}

impl<T: ?Sized> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinLockGuard<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for SpinLockGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Release);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SpinLockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::SpinLock;

    #[test]
    fn smoke() {
        let m = SpinLock::new(());
        drop(m.lock());
        drop(m.lock());
    }

    #[test]
    fn try_lock_while_held() {
        let m = SpinLock::new(5);
        let guard = m.lock();
        assert!(m.is_locked());
        assert!(m.try_lock().is_none());
        drop(guard);
        assert!(!m.is_locked());
        assert_eq!(*m.try_lock().unwrap(), 5);
    }

    #[test]
    fn get_mut_and_into_inner() {
        let mut m = SpinLock::new(10);
        *m.get_mut() = 20;
        assert_eq!(*m.lock(), 20);
        assert_eq!(m.into_inner(), 20);
    }

    #[cfg(feature = "std")]
    #[test]
    fn lots_and_lots() {
        use std::thread;

        const THREADS: u32 = 6;
        const ROUNDS: u32 = 1000;

        let m = SpinLock::new(0_u32);
        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        *m.lock() += 1;
                    }
                });
            }
        });
        assert_eq!(m.into_inner(), THREADS * ROUNDS);
    }
}
