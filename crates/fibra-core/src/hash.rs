//! Hashing of effect dependencies.

use std::hash::{Hash, Hasher};

#[cfg(not(feature = "std-hash"))]
type DepHasher = ahash::AHasher;

#[cfg(feature = "std-hash")]
type DepHasher = std::collections::hash_map::DefaultHasher;

/// Hashes a single effect dependency. Two renders compare dependency lists
/// by these values.
pub fn hash_dep<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DepHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_hash_equal() {
        assert_eq!(hash_dep(&(1, "a")), hash_dep(&(1, "a")));
        assert_ne!(hash_dep(&1u32), hash_dep(&2u32));
    }
}
