use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use simurghdb::trie::{Trie, TrieStore};

#[test]
fn test_overwrite_and_prune_sequence() {
    let trie = Trie::new().put("ab", 1i32).put("abc", 2i32);

    assert_eq!(trie.get::<i32>("ab"), Some(&1));
    assert_eq!(trie.get::<i32>("abc"), Some(&2));

    let trie = trie.remove("ab");
    assert_eq!(trie.get::<i32>("ab"), None);
    assert_eq!(trie.get::<i32>("abc"), Some(&2));

    let trie = trie.remove("abc");
    assert_eq!(trie.get::<i32>("abc"), None);
    assert!(trie.root().is_none());
}

#[test]
fn test_snapshots_are_independent() {
    let v1 = Trie::new().put("k", 10u64);
    let v2 = v1.put("k", 20u64);
    let v3 = v2.remove("k");

    assert_eq!(v1.get::<u64>("k"), Some(&10));
    assert_eq!(v2.get::<u64>("k"), Some(&20));
    assert_eq!(v3.get::<u64>("k"), None);
}

#[test]
fn test_store_value_guard_pins_snapshot() {
    let store = TrieStore::new();
    store.put("key", 1u32);

    let guard = store.get::<u32>("key").unwrap();
    store.put("key", 2u32);

    // The guard still reads 1 from its snapshot while the store moved on
    assert_eq!(*guard, 1);
    assert_eq!(*store.get::<u32>("key").unwrap(), 2);
}

#[test]
fn test_concurrent_readers_with_one_writer() {
    const READERS: usize = 4;
    const WRITES: u32 = 500;

    let store = Arc::new(TrieStore::new());
    let stop = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..READERS {
        let store = Arc::clone(&store);
        let stop = Arc::clone(&stop);
        readers.push(thread::spawn(move || {
            let mut observations = 0usize;
            while !stop.load(Ordering::Relaxed) {
                if let Some(guard) = store.get::<u32>("k") {
                    // Only values the writer actually committed may appear
                    assert!(*guard < WRITES);
                }
                observations += 1;
            }
            observations
        }));
    }

    // One writer alternates put and remove
    for i in 0..WRITES {
        store.put("k", i);
        store.remove("k");
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        let observations = reader.join().unwrap();
        assert!(observations > 0);
    }

    // The final remove left the store empty
    assert!(store.get::<u32>("k").is_none());
}
