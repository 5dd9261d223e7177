use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A shareable, dynamically typed value slot.
///
/// The trie stores values of arbitrary types side by side; typed accessors
/// downcast and return nothing on a type mismatch.
pub type TrieValue = Arc<dyn Any + Send + Sync>;

/// One immutable trie node: children keyed by byte, plus an optional value.
///
/// Nodes are never mutated after construction; updates clone the nodes on
/// the affected path and share every other subtree by reference.
#[derive(Default, Clone)]
pub struct TrieNode {
    pub children: HashMap<u8, Arc<TrieNode>>,
    pub value: Option<TrieValue>,
}

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// A valueless node adopting an existing child map
    pub fn with_children(children: HashMap<u8, Arc<TrieNode>>) -> Self {
        Self {
            children,
            value: None,
        }
    }

    pub fn is_value_node(&self) -> bool {
        self.value.is_some()
    }
}
