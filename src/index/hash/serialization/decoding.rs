use std::any::TypeId;
use byteorder::{ByteOrder, LittleEndian};
use serde::Deserialize;

use crate::common::types::{Page, Rid, PAGE_SIZE};
use crate::index::hash::error::HashIndexError;
use crate::index::hash::page::{HashBucketPage, HashDirectoryPage, HashHeaderPage};
use super::encoding::{BUCKET_HEADER_SIZE, DIRECTORY_HEADER_SIZE, RID_SIZE};

/// Deserialize the header page
pub fn deserialize_header(page: &Page) -> Result<HashHeaderPage, HashIndexError> {
    let max_depth = LittleEndian::read_u32(&page.data[0..4]);
    let slots = 1usize
        .checked_shl(max_depth)
        .ok_or(HashIndexError::InvalidPageFormat)?;
    if 4 + 4 * slots > PAGE_SIZE {
        return Err(HashIndexError::InvalidPageFormat);
    }

    let mut directory_page_ids = Vec::with_capacity(slots);
    let mut offset = 4;
    for _ in 0..slots {
        directory_page_ids.push(LittleEndian::read_u32(&page.data[offset..offset + 4]));
        offset += 4;
    }

    Ok(HashHeaderPage {
        max_depth,
        directory_page_ids,
    })
}

/// Deserialize a directory page
pub fn deserialize_directory(page: &Page) -> Result<HashDirectoryPage, HashIndexError> {
    let max_depth = LittleEndian::read_u32(&page.data[0..4]);
    let global_depth = LittleEndian::read_u32(&page.data[4..8]);

    let slots = 1usize
        .checked_shl(max_depth)
        .ok_or(HashIndexError::InvalidPageFormat)?;
    if DIRECTORY_HEADER_SIZE + 5 * slots > PAGE_SIZE || global_depth > max_depth {
        return Err(HashIndexError::InvalidPageFormat);
    }

    let mut offset = DIRECTORY_HEADER_SIZE;
    let local_depths = page.data[offset..offset + slots].to_vec();
    offset += slots;

    let mut bucket_page_ids = Vec::with_capacity(slots);
    for _ in 0..slots {
        bucket_page_ids.push(LittleEndian::read_u32(&page.data[offset..offset + 4]));
        offset += 4;
    }

    Ok(HashDirectoryPage {
        max_depth,
        global_depth,
        local_depths,
        bucket_page_ids,
    })
}

/// Deserialize a bucket page
pub fn deserialize_bucket<K>(page: &Page) -> Result<HashBucketPage<K>, HashIndexError>
where
    K: for<'de> Deserialize<'de> + Clone + Ord + 'static,
{
    let size = LittleEndian::read_u32(&page.data[0..4]) as usize;
    let max_size = LittleEndian::read_u32(&page.data[4..8]);

    let mut entries = Vec::with_capacity(size);
    let mut offset = BUCKET_HEADER_SIZE;

    for _ in 0..size {
        // Special case for i32 keys to avoid bincode overhead
        let key = if TypeId::of::<K>() == TypeId::of::<i32>() {
            if offset + 4 + RID_SIZE > PAGE_SIZE {
                return Err(HashIndexError::DeserializationError(
                    "Truncated bucket entry".to_string(),
                ));
            }
            let key_value = LittleEndian::read_i32(&page.data[offset..offset + 4]);
            offset += 4;
            // Safety: guarded by the TypeId check above
            unsafe { std::mem::transmute_copy::<i32, K>(&key_value) }
        } else {
            let key_len = LittleEndian::read_u16(&page.data[offset..offset + 2]) as usize;
            offset += 2;
            if offset + key_len + RID_SIZE > PAGE_SIZE {
                return Err(HashIndexError::DeserializationError(
                    "Truncated bucket entry".to_string(),
                ));
            }
            let key = bincode::deserialize(&page.data[offset..offset + key_len]).map_err(|_| {
                HashIndexError::DeserializationError("Failed to deserialize key".to_string())
            })?;
            offset += key_len;
            key
        };

        let page_id = LittleEndian::read_u32(&page.data[offset..offset + 4]);
        offset += 4;
        let slot_num = LittleEndian::read_u32(&page.data[offset..offset + 4]);
        offset += 4;

        entries.push((key, Rid::new(page_id, slot_num)));
    }

    Ok(HashBucketPage { max_size, entries })
}
