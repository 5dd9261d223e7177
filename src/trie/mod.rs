pub mod node;
pub mod store;
pub mod tree;

pub use node::{TrieNode, TrieValue};
pub use store::{TrieStore, ValueGuard};
pub use tree::Trie;
