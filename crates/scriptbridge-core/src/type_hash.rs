//! Deterministic hash-based identity for native reflected types.
//!
//! [`TypeHash`] is a 64-bit hash computed from a type's name (classes,
//! structs, enums, interfaces) or from an owner plus a function name. The
//! same input always produces the same hash, so descriptors can reference a
//! class before the class itself is registered.
//!
//! # Examples
//!
//! ```
//! use scriptbridge_core::TypeHash;
//!
//! let actor = TypeHash::from_name("Actor");
//! assert_eq!(actor, TypeHash::from_name("Actor"));
//!
//! let tick = TypeHash::from_function(actor, "Tick");
//! assert_ne!(tick, TypeHash::from_function(TypeHash::from_name("Pawn"), "Tick"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Types and functions sharing a name still produce distinct hashes.
pub mod hash_constants {
    /// Separator constant mixed between an owner and a member name
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for function hashes
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Seed for hashing native container keys
    pub const KEY: u64 = 0x7d3c8b4a92e15f6d;
}

/// A deterministic 64-bit hash identifying a native type or function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a function hash from the owning type and the function name.
    ///
    /// An override shares its name with the function it overrides but not its
    /// owner, so the two hash differently.
    #[inline]
    pub fn from_function(owner: TypeHash, name: &str) -> Self {
        let hash = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(hash.wrapping_mul(hash_constants::SEP).wrapping_add(owner.0))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
