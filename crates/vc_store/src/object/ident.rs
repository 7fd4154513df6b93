use core::cmp::Ordering;
use core::fmt::{Debug, Display};
use core::hash::Hash;
use core::marker::PhantomData;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Handle32

/// A stable reference to an object in an [`ObjectStorage`].
///
/// The raw `u32` is `slot + 1`, where `slot` is the logical slot in the
/// storage's lookup table. `0` is the null handle.
///
/// `Handle32` carries no version. Slots are recycled after a destroy, so
/// detecting stale handles is the owner's job.
///
/// [`ObjectStorage`]: crate::object::ObjectStorage
#[repr(transparent)]
pub struct Handle32<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle32<T> {
    /// The null handle, never returned by a storage.
    pub const NULL: Self = Self::from_raw(0);

    /// Creates a handle from its raw value, `0` being null.
    #[inline(always)]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Creates the handle of logical slot `slot`.
    ///
    /// # Panics
    /// Panics if `slot >= u32::MAX`.
    #[inline]
    pub const fn from_slot(slot: u32) -> Self {
        assert!(slot < u32::MAX, "logical slot out of range");
        Self::from_raw(slot + 1)
    }

    /// Returns the raw value.
    #[inline(always)]
    pub const fn to_raw(self) -> u32 {
        self.raw
    }

    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.raw == 0
    }

    /// Returns the logical slot, `None` for the null handle.
    #[inline]
    pub const fn slot(self) -> Option<usize> {
        match self.raw {
            0 => None,
            raw => Some((raw - 1) as usize),
        }
    }
}

impl<T> Clone for Handle32<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle32<T> {}

impl<T> Default for Handle32<T> {
    #[inline(always)]
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> PartialEq for Handle32<T> {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle32<T> {}

impl<T> PartialOrd for Handle32<T> {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle32<T> {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Handle32<T> {
    #[inline(always)]
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(self.raw);
    }
}

impl<T> Debug for Handle32<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl<T> Display for Handle32<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.slot() {
            Some(slot) => write!(f, "#{slot}"),
            None => f.pad("NULL"),
        }
    }
}

impl<T> Serialize for Handle32<T> {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.raw)
    }
}

impl<'de, T> Deserialize<'de> for Handle32<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let raw: u32 = Deserialize::deserialize(deserializer)?;
        if raw == 0 {
            return Err(Error::custom("Attempting to deserialize a null object handle."));
        }
        Ok(Self::from_raw(raw))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Handle32;
    use alloc::string::ToString;

    struct Opaque;

    #[test]
    fn slot_is_one_based() {
        let handle = Handle32::<Opaque>::from_slot(0);
        assert_eq!(handle.to_raw(), 1);
        assert_eq!(handle.slot(), Some(0));
        assert!(!handle.is_null());

        assert_eq!(Handle32::<Opaque>::NULL.slot(), None);
        assert_eq!(Handle32::<Opaque>::default(), Handle32::NULL);
    }

    #[test]
    fn traits_without_bounds_on_t() {
        let a = Handle32::<Opaque>::from_slot(4);
        let b = a;
        assert_eq!(a, b);
        assert!(Handle32::<Opaque>::from_slot(1) < a);
        assert_eq!(a.to_string(), "#4");
        assert_eq!(Handle32::<Opaque>::NULL.to_string(), "NULL");
    }

    #[cfg(feature = "std")]
    #[test]
    fn serde_as_u32() {
        let handle = Handle32::<Opaque>::from_slot(9);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "10");

        let back: Handle32<Opaque> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
        assert!(serde_json::from_str::<Handle32<Opaque>>("0").is_err());
    }
}
