use std::any::TypeId;
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::common::types::{Page, PAGE_SIZE};
use crate::index::hash::error::HashIndexError;
use crate::index::hash::page::{HashBucketPage, HashDirectoryPage, HashHeaderPage};

// Header page layout:
// - max_depth: u32 (4 bytes)
// - directory_page_ids: 2^max_depth x u32

// Directory page layout:
// - max_depth: u32 (4 bytes)
// - global_depth: u32 (4 bytes)
// - local_depths: 2^max_depth x u8
// - bucket_page_ids: 2^max_depth x u32
pub(crate) const DIRECTORY_HEADER_SIZE: usize = 8;

// Bucket page layout:
// - size: u32 (4 bytes)
// - max_size: u32 (4 bytes)
// - entries: size x (key, rid); i32 keys are 4 bytes inline, other keys
//   are a u16 length followed by bincode bytes; a rid is two u32s
pub(crate) const BUCKET_HEADER_SIZE: usize = 8;
pub(crate) const RID_SIZE: usize = 8;

/// Serialize the header page
pub fn serialize_header(header: &HashHeaderPage, page: &mut Page) -> Result<(), HashIndexError> {
    let slots = header.size();
    if 4 + 4 * slots > PAGE_SIZE {
        return Err(HashIndexError::HeaderTooLarge);
    }

    page.data.fill(0);
    LittleEndian::write_u32(&mut page.data[0..4], header.max_depth);

    let mut offset = 4;
    for &dir_page_id in &header.directory_page_ids {
        LittleEndian::write_u32(&mut page.data[offset..offset + 4], dir_page_id);
        offset += 4;
    }

    Ok(())
}

/// Serialize a directory page.
///
/// The full physical arrays are written, shadow slots included, so a
/// directory that shrank and regrows sees its old pointers again.
pub fn serialize_directory(dir: &HashDirectoryPage, page: &mut Page) -> Result<(), HashIndexError> {
    let slots = 1usize << dir.max_depth;
    if DIRECTORY_HEADER_SIZE + 5 * slots > PAGE_SIZE {
        return Err(HashIndexError::DirectoryTooLarge);
    }

    page.data.fill(0);
    LittleEndian::write_u32(&mut page.data[0..4], dir.max_depth);
    LittleEndian::write_u32(&mut page.data[4..8], dir.global_depth);

    let mut offset = DIRECTORY_HEADER_SIZE;
    page.data[offset..offset + slots].copy_from_slice(&dir.local_depths);
    offset += slots;

    for &bucket_page_id in &dir.bucket_page_ids {
        LittleEndian::write_u32(&mut page.data[offset..offset + 4], bucket_page_id);
        offset += 4;
    }

    Ok(())
}

/// Serialize a bucket page
pub fn serialize_bucket<K>(bucket: &HashBucketPage<K>, page: &mut Page) -> Result<(), HashIndexError>
where
    K: Serialize + Clone + Ord + 'static,
{
    page.data.fill(0);
    LittleEndian::write_u32(&mut page.data[0..4], bucket.entries.len() as u32);
    LittleEndian::write_u32(&mut page.data[4..8], bucket.max_size);

    let mut offset = BUCKET_HEADER_SIZE;

    for (key, rid) in &bucket.entries {
        // Special case for i32 keys to avoid bincode overhead
        if TypeId::of::<K>() == TypeId::of::<i32>() {
            if offset + 4 + RID_SIZE > PAGE_SIZE {
                return Err(HashIndexError::BucketTooLarge);
            }
            // Safety: guarded by the TypeId check above
            let key_value = unsafe { std::mem::transmute_copy::<K, i32>(key) };
            LittleEndian::write_i32(&mut page.data[offset..offset + 4], key_value);
            offset += 4;
        } else {
            let key_bytes = bincode::serialize(key)
                .map_err(|_| HashIndexError::SerializationError("Failed to serialize key".to_string()))?;

            if offset + 2 + key_bytes.len() + RID_SIZE > PAGE_SIZE {
                return Err(HashIndexError::BucketTooLarge);
            }

            LittleEndian::write_u16(&mut page.data[offset..offset + 2], key_bytes.len() as u16);
            offset += 2;
            page.data[offset..offset + key_bytes.len()].copy_from_slice(&key_bytes);
            offset += key_bytes.len();
        }

        LittleEndian::write_u32(&mut page.data[offset..offset + 4], rid.page_id);
        offset += 4;
        LittleEndian::write_u32(&mut page.data[offset..offset + 4], rid.slot_num);
        offset += 4;
    }

    Ok(())
}
