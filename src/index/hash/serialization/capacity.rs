use std::mem;
use crate::common::types::{Rid, PAGE_SIZE};
use super::encoding::{BUCKET_HEADER_SIZE, DIRECTORY_HEADER_SIZE};

/// Deepest header a page can hold: 4 bytes of depth + 2^d directory IDs
pub const MAX_HEADER_DEPTH: u32 = 10;

/// Deepest directory a page can hold: 8 bytes of depths + 2^d local depth
/// bytes + 2^d bucket IDs
pub const MAX_DIRECTORY_DEPTH: u32 = 10;

const _: () = assert!(4 + 4 * (1usize << MAX_HEADER_DEPTH) <= PAGE_SIZE);
const _: () = assert!(DIRECTORY_HEADER_SIZE + 5 * (1usize << MAX_DIRECTORY_DEPTH) <= PAGE_SIZE);

/// Calculate how many entries a bucket page can hold based on key size
pub fn calculate_bucket_capacity<K: 'static>() -> usize {
    // Rough estimate based on key size and overhead
    let key_size = if std::any::TypeId::of::<K>() == std::any::TypeId::of::<i32>() {
        4
    } else {
        // Length prefix plus the serialized body, estimated from the
        // in-memory size; variable-width keys are re-checked at encode time
        2 + mem::size_of::<K>()
    };
    let value_size = mem::size_of::<Rid>();

    let capacity = (PAGE_SIZE - BUCKET_HEADER_SIZE) / (key_size + value_size);

    // A bucket that can hold fewer than 2 entries cannot split usefully
    capacity.max(2)
}
