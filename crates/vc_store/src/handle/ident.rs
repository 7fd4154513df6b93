use core::cmp::Ordering;
use core::fmt::{Debug, Display};
use core::hash::Hash;
use core::marker::PhantomData;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// HandleId

/// The packed, non-zero identifier of a [`HandleAllocator`] slot.
///
/// Bit layout of the `u32`:
///
/// ```text
///  31 30 | 29 .. 26 | 25 ........................ 0
///  unused|   pool   |  1-based index in the pool
/// ```
///
/// The raw value `0` is reserved for the null handle, which is why the
/// index is stored 1-based.
///
/// [`HandleAllocator`]: crate::handle::HandleAllocator
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HandleId(NonZeroU32);

impl HandleId {
    /// Number of bits used by the 1-based index.
    pub const INDEX_BITS: u32 = 26;

    /// Mask of the index bits.
    pub const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;

    /// Mask of the pool bits, after shifting by [`INDEX_BITS`](Self::INDEX_BITS).
    pub const POOL_MASK: u32 = 0xF;

    /// Largest 0-based index that can be packed.
    pub const MAX_INDEX: u32 = Self::INDEX_MASK - 1;

    /// Largest pool number that can be packed.
    pub const MAX_POOL: u32 = Self::POOL_MASK;

    /// Packs a pool number and a 0-based index inside that pool.
    ///
    /// # Panics
    /// Panics if `pool > MAX_POOL` or `index > MAX_INDEX`.
    #[inline]
    pub const fn new(pool: u32, index: u32) -> Self {
        assert!(pool <= Self::MAX_POOL, "pool number out of range");
        assert!(index <= Self::MAX_INDEX, "slot index out of range");
        let raw = (pool << Self::INDEX_BITS) | (index + 1);
        // SAFETY: `index + 1` is never zero.
        Self(unsafe { NonZeroU32::new_unchecked(raw) })
    }

    /// Reinterprets a raw packed value, `None` for the null id.
    ///
    /// Values whose index bits are zero are rejected as well: they cannot
    /// be produced by [`new`](Self::new).
    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw & Self::INDEX_MASK == 0 {
            return None;
        }
        // SAFETY: The index bits are non-zero.
        Some(Self(unsafe { NonZeroU32::new_unchecked(raw) }))
    }

    /// Returns the raw packed value.
    #[inline(always)]
    pub const fn to_raw(self) -> u32 {
        self.0.get()
    }

    /// Returns the pool number.
    #[inline(always)]
    pub const fn pool(self) -> u32 {
        (self.0.get() >> Self::INDEX_BITS) & Self::POOL_MASK
    }

    /// Returns the 0-based slot index inside the pool.
    #[inline(always)]
    pub const fn index(self) -> u32 {
        (self.0.get() & Self::INDEX_MASK) - 1
    }
}

impl Debug for HandleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for HandleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.pool(), self.index())
    }
}

const _: () = {
    let id = HandleId::new(15, 1234);
    assert!(id.pool() == 15 && id.index() == 1234);
    assert!(HandleId::new(0, 0).to_raw() == 1);
};

// -----------------------------------------------------------------------------
// Version

/// The generation of a slot.
///
/// A slot starts at [`Version::FIRST`] and is bumped every time it is freed.
/// The counter wraps from `u32::MAX` back to `1`, never to `0`, so a live
/// handle never carries the null version. After a wrap an old handle may
/// alias a newer occupant, so handles should not be held for that long.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Version(NonZeroU32);

impl Version {
    /// The version of a slot that has never been freed.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Wraps a raw version, `None` for `0`.
    #[inline(always)]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Returns the raw value.
    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the next version, and whether the counter wrapped.
    #[inline]
    pub const fn bump(self) -> (Self, bool) {
        match NonZeroU32::new(self.0.get().wrapping_add(1)) {
            Some(next) => (Self(next), false),
            None => (Self::FIRST, true),
        }
    }
}

impl PartialEq<u32> for Version {
    #[inline(always)]
    fn eq(&self, other: &u32) -> bool {
        self.get() == *other
    }
}

impl Debug for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.get(), f)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.get(), f)
    }
}

// -----------------------------------------------------------------------------
// Handle

/// A versioned reference to a `T` owned by a [`HandleAllocator`].
///
/// A handle is a packed [`HandleId`] plus the [`Version`] its slot had when
/// the value was allocated. It stays valid until that value is freed; from
/// then on the slot's version differs and lookups with the old handle fail.
///
/// The 64-bit representation ([`to_bits`](Self::to_bits)) puts the id in the
/// low half and the version in the high half. That value is what other
/// systems store and what serde serializes.
///
/// [`HandleAllocator`]: crate::handle::HandleAllocator
#[repr(C, align(8))]
pub struct Handle<T> {
    id: u32,
    version: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle, never returned for a live value.
    pub const NULL: Self = Self::from_parts(0, 0);

    #[inline(always)]
    const fn from_parts(id: u32, version: u32) -> Self {
        Self {
            id,
            version,
            _marker: PhantomData,
        }
    }

    /// Creates a handle from its parts.
    #[inline(always)]
    pub const fn new(id: HandleId, version: Version) -> Self {
        Self::from_parts(id.to_raw(), version.get())
    }

    /// Returns `true` for [`Handle::NULL`] (or anything with a null id).
    #[inline(always)]
    pub const fn is_null(self) -> bool {
        HandleId::from_raw(self.id).is_none()
    }

    /// Returns the packed id, `None` for the null handle.
    #[inline(always)]
    pub const fn id(self) -> Option<HandleId> {
        HandleId::from_raw(self.id)
    }

    /// Returns the raw packed id, `0` for the null handle.
    #[inline(always)]
    pub const fn raw_id(self) -> u32 {
        self.id
    }

    /// Returns the raw version carried by this handle, `0` for the null handle.
    #[inline(always)]
    pub const fn version(self) -> u32 {
        self.version
    }

    /// Converts the handle to its raw `u64` representation.
    #[inline(always)]
    pub const fn to_bits(self) -> u64 {
        ((self.version as u64) << 32) | self.id as u64
    }

    /// Creates a handle from its raw `u64` representation.
    ///
    /// # Panics
    /// Panics if the decoded id is null.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        let handle = Self::from_bits_unchecked(bits);
        assert!(!handle.is_null(), "attempted to decode a null handle");
        handle
    }

    /// Creates a handle from its raw `u64` representation without validation.
    ///
    /// Null ids decode to a null handle.
    #[inline(always)]
    pub const fn from_bits_unchecked(bits: u64) -> Self {
        Self::from_parts(bits as u32, (bits >> 32) as u32)
    }
}

impl<T> Clone for Handle<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Default for Handle<T> {
    #[inline(always)]
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> PartialEq for Handle<T> {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bits().cmp(&other.to_bits())
    }
}

impl<T> Hash for Handle<T> {
    #[inline(always)]
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_bits());
    }
}

impl<T> Debug for Handle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl<T> Display for Handle<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{id}v{}", self.version),
            None => f.pad("NULL"),
        }
    }
}

impl<T> Serialize for Handle<T> {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.to_bits())
    }
}

impl<'de, T> Deserialize<'de> for Handle<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let bits: u64 = Deserialize::deserialize(deserializer)?;
        let handle = Self::from_bits_unchecked(bits);
        if handle.is_null() {
            return Err(Error::custom("Attempting to deserialize a null handle."));
        }
        Ok(handle)
    }
}

// -----------------------------------------------------------------------------
// Tests
