use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// 32-bit hash function supplied to the index at construction
pub trait KeyHasher<K> {
    fn hash_key(&self, key: &K) -> u32;
}

/// Default key hash: the std hasher truncated to 32 bits.
///
/// `DefaultHasher::new()` uses fixed keys, so the same key hashes the same
/// way in every process — required for a disk-resident table to route
/// consistently across restarts.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeyHasher;

impl<K: Hash> KeyHasher<K> for DefaultKeyHasher {
    fn hash_key(&self, key: &K) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as u32
    }
}
