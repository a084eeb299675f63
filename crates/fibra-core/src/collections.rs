//! Map aliases for the keyed-child lookup and the test doubles.
//!
//! FxHash by default; the `std-hash` feature falls back to the std hasher.

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
    pub type HashSet<T> = rustc_hash::FxHashSet<T>;
}

#[cfg(feature = "std-hash")]
pub mod map {
    pub type HashMap<K, V> = std::collections::HashMap<K, V>;
    pub type HashSet<T> = std::collections::HashSet<T>;
}
