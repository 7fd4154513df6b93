/// A debug checked version of [`Option::unwrap_unchecked`].
///
/// Panics when unwrapping a `None` in debug mode (or with the `debug`
/// feature), but is equivalent to `Option::unwrap_unchecked` otherwise.
#[doc(hidden)]
pub trait DebugCheckedUnwrap {
    type Item;

    /// # Safety
    /// This must never be called on a `None` value.
    unsafe fn debug_checked_unwrap(self) -> Self::Item;
}

impl<T> DebugCheckedUnwrap for Option<T> {
    type Item = T;

    #[cfg(any(feature = "debug", debug_assertions))]
    #[inline(always)]
    #[track_caller]
    unsafe fn debug_checked_unwrap(self) -> Self::Item {
        if let Some(inner) = self {
            inner
        } else {
            unreachable!()
        }
    }

    #[cfg(not(any(feature = "debug", debug_assertions)))]
    #[inline(always)]
    unsafe fn debug_checked_unwrap(self) -> Self::Item {
        unsafe { self.unwrap_unchecked() }
    }
}
