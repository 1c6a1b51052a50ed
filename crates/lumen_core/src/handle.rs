//! Host-minted handles and the worker-side handle registry
//!
//! The host names every object it creates with a 64-bit [`Handle`] before the
//! worker has seen it. The worker never allocates identities of its own: it
//! only binds the handles it receives to locally constructed objects through
//! a [`HandleRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::HandleError;

/// Opaque 64-bit identity minted by the host
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Handle {
    /// Lower 48 bits: local index, Upper 16 bits: owner (host device epoch)
    bits: u64,
}

/// The reserved "no object" handle
pub const NULL_HANDLE: Handle = Handle::NULL;

impl Handle {
    /// Number of bits used by the local index
    pub const INDEX_BITS: u32 = 48;
    /// Maximum index value (48 bits)
    pub const MAX_INDEX: u64 = (1 << Self::INDEX_BITS) - 1;
    /// The null handle
    pub const NULL: Self = Self { bits: 0 };

    /// Create a handle from a local index and the owner that minted it
    #[inline]
    pub const fn new(index: u64, owner: u16) -> Self {
        debug_assert!(index <= Self::MAX_INDEX);
        Self {
            bits: (owner as u64) << Self::INDEX_BITS | (index & Self::MAX_INDEX),
        }
    }

    /// Check if this is the null handle
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == 0
    }

    /// Get the local index portion
    #[inline]
    pub const fn index(&self) -> u64 {
        self.bits & Self::MAX_INDEX
    }

    /// Get the owner (host epoch) portion
    #[inline]
    pub const fn owner(&self) -> u16 {
        (self.bits >> Self::INDEX_BITS) as u16
    }

    /// Convert to raw bits, as carried on the wire
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({}@{})", self.index(), self.owner())
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.bits)
    }
}

/// Mints handles on the host side of the protocol
///
/// Every host device uses its own owner id, so handles from different hosts
/// never collide. Index 0 is never handed out under owner 0, which keeps
/// [`NULL_HANDLE`] reserved.
#[derive(Debug, Clone)]
pub struct HandleMinter {
    owner: u16,
    next_index: u64,
}

impl HandleMinter {
    /// Create a minter for the given owner
    pub fn new(owner: u16) -> Self {
        Self {
            owner,
            next_index: 1,
        }
    }

    /// Mint the next handle
    ///
    /// # Panics
    ///
    /// Panics once all 2^48 indices of this owner are used.
    pub fn mint(&mut self) -> Handle {
        let index = self.next_index;
        if index > Handle::MAX_INDEX {
            panic!("Handle minter exhausted");
        }
        self.next_index += 1;
        Handle::new(index, self.owner)
    }

    /// Number of handles minted so far
    pub fn minted(&self) -> u64 {
        self.next_index - 1
    }
}

impl Default for HandleMinter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Binds host handles to worker-side values
///
/// For any non-null handle there is either no binding or exactly one, and a
/// binding never changes until it is released.
pub struct HandleRegistry<T> {
    bindings: HashMap<Handle, T>,
}

impl<T> HandleRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind `value` to `handle`
    ///
    /// Fails if the handle is null or already bound; the existing binding is
    /// left untouched in that case.
    pub fn assign(&mut self, handle: Handle, value: T) -> Result<(), HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        if self.bindings.contains_key(&handle) {
            return Err(HandleError::AlreadyBound(handle));
        }
        self.bindings.insert(handle, value);
        Ok(())
    }

    /// Look up the value bound to `handle`
    ///
    /// The null handle resolves to `None`; an unbound non-null handle is an
    /// error.
    pub fn lookup(&self, handle: Handle) -> Result<Option<&T>, HandleError> {
        if handle.is_null() {
            return Ok(None);
        }
        self.bindings
            .get(&handle)
            .map(Some)
            .ok_or(HandleError::Unbound(handle))
    }

    /// Look up the value bound to `handle`, treating null and unbound alike
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.bindings.get(&handle)
    }

    /// Remove the binding for `handle` and hand the value back
    pub fn release(&mut self, handle: Handle) -> Result<T, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        self.bindings
            .remove(&handle)
            .ok_or(HandleError::Unbound(handle))
    }

    /// Check if a handle is bound
    pub fn contains(&self, handle: Handle) -> bool {
        self.bindings.contains_key(&handle)
    }

    /// Get the number of bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over all bindings
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.bindings.iter().map(|(h, v)| (*h, v))
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
