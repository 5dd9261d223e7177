// Export public modules
pub mod common;
pub mod storage;
pub mod index;
pub mod trie;

// Re-export key items for convenient access
pub use storage::buffer::BufferPoolManager;
pub use storage::buffer::BufferPoolError;
pub use storage::buffer::{PageGuard, ReadPageGuard, WritePageGuard};
pub use storage::disk::{DiskManager, DiskScheduler};
pub use index::hash::ExtendibleHashIndex;
pub use trie::{Trie, TrieStore};
