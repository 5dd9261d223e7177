use std::ops::Deref;
use std::sync::Arc;
use parking_lot::Mutex;

use crate::trie::tree::Trie;

/// Keeps a value returned by [`TrieStore::get`] alive.
///
/// The guard holds the trie snapshot the lookup ran against, so the value
/// stays reachable no matter how many writes land after it was taken.
pub struct ValueGuard<T> {
    snapshot: Trie,
    value: Arc<T>,
}

impl<T> ValueGuard<T> {
    /// The snapshot this value was read from
    pub fn snapshot(&self) -> &Trie {
        &self.snapshot
    }
}

impl<T> Deref for ValueGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// A thread-safe handle over a current trie.
///
/// Two independent locks: the root lock only guards swapping the current
/// trie handle in and out, and the writer lock serializes mutations. A
/// reader snapshots the handle and runs its lookup outside any lock, so
/// readers never block each other and never block on lookup work.
#[derive(Default)]
pub struct TrieStore {
    root: Mutex<Trie>,
    write_lock: Mutex<()>,
}

impl TrieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key in the current trie.
    ///
    /// The root lock is held only long enough to clone the handle.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<ValueGuard<T>> {
        let snapshot = { self.root.lock().clone() };

        let value = snapshot.get_owned::<T>(key)?;
        Some(ValueGuard { snapshot, value })
    }

    /// Store a value under a key, replacing any prior value.
    ///
    /// Writers queue up on the writer lock; the new trie is computed there
    /// and swapped in under a brief root lock.
    pub fn put<T: Send + Sync + 'static>(&self, key: &str, value: T) {
        let _writer = self.write_lock.lock();

        let snapshot = { self.root.lock().clone() };
        let new_root = snapshot.put(key, value);
        *self.root.lock() = new_root;
    }

    /// Remove a key's value, if any
    pub fn remove(&self, key: &str) {
        let _writer = self.write_lock.lock();

        let snapshot = { self.root.lock().clone() };
        let new_root = snapshot.remove(key);
        *self.root.lock() = new_root;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_put_get_remove() {
        let store = TrieStore::new();

        store.put("k", 1u32);
        assert_eq!(*store.get::<u32>("k").unwrap(), 1);

        store.put("k", 2u32);
        assert_eq!(*store.get::<u32>("k").unwrap(), 2);

        store.remove("k");
        assert!(store.get::<u32>("k").is_none());
    }

    #[test]
    fn test_guard_outlives_overwrite() {
        let store = TrieStore::new();
        store.put("k", "before".to_string());

        let guard = store.get::<String>("k").unwrap();
        store.put("k", "after".to_string());
        store.remove("k");

        // The guard still sees its snapshot's value
        assert_eq!(&*guard, "before");
        assert_eq!(guard.snapshot().get::<String>("k"), Some(&"before".to_string()));
        assert!(store.get::<String>("k").is_none());
    }

    #[test]
    fn test_type_mismatch_returns_none() {
        let store = TrieStore::new();
        store.put("k", 5u64);
        assert!(store.get::<u32>("k").is_none());
        assert_eq!(*store.get::<u64>("k").unwrap(), 5);
    }
}
