//! Fixed-width keys identifying resources by name.

use core::fmt;
use core::hash::Hasher;
use rustc_hash::FxHasher;

/// Key for accessing a resource.
///
/// Computed by hashing a string identifier with `FxHasher`. Two keys are
/// equal iff their hash values are equal; distinct identifiers that collide
/// map to the same resource.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ResourceKey(u64);

impl ResourceKey {
    /// Hash `name` into a key.
    pub fn new(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(name.as_bytes());
        Self(hasher.finish())
    }

    /// Wrap an already computed hash value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The hash value; also used directly as the table hash.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for ResourceKey {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceKey {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({:016x})", self.0)
    }
}
