//! Fast hash map and hash set type aliases.
//!
//! Type aliases for [`FxHashMap`] and [`FxHashSet`] from the `rustc-hash`
//! crate. Task identifiers are process-generated, so denial-of-service
//! resistant hashing is not required.
//!
//! # Examples
//!
//! ```
//! use dr_core::{FxHashMap, fx_hash_map};
//!
//! let mut map: FxHashMap<String, i32> = fx_hash_map();
//! map.insert("key".to_owned(), 42);
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
///
/// # Examples
///
/// ```
/// use dr_core::fx_hash_map;
///
/// let map: dr_core::FxHashMap<String, i32> = fx_hash_map();
/// assert!(map.is_empty());
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}
