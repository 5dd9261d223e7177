use log::debug;
use serde::{Serialize, Deserialize};

use crate::common::types::INVALID_PAGE_ID;
use crate::index::hash::error::HashIndexError;
use crate::index::hash::hasher::KeyHasher;
use crate::index::hash::serialization::{
    deserialize_bucket, deserialize_directory, deserialize_header, serialize_bucket,
    serialize_directory,
};
use super::base::ExtendibleHashIndex;

impl<K, H> ExtendibleHashIndex<K, H>
where
    K: Clone + Ord + Serialize + for<'de> Deserialize<'de> + 'static,
    H: KeyHasher<K>,
{
    /// Remove a key, merging emptied-out split partners and shrinking the
    /// directory when no slot needs its deepest routing bit anymore.
    ///
    /// Returns false when the key is absent; a second remove of the same
    /// key changes nothing.
    pub fn remove(&self, key: &K) -> Result<bool, HashIndexError> {
        let _latch = self.latch.write();
        let hash = self.hash(key);

        let header_guard = self.buffer_pool.fetch_page_read(self.header_page_id)?;
        let header = deserialize_header(&header_guard)?;
        drop(header_guard);

        let dir_page_id = header.directory_page_id(header.hash_to_directory_index(hash));
        if dir_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut dir_guard = self.buffer_pool.fetch_page_write(dir_page_id)?;
        let mut dir = deserialize_directory(&dir_guard)?;

        let bucket_idx = dir.hash_to_bucket_index(hash);
        let bucket_page_id = dir.bucket_page_id(bucket_idx);
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let mut bucket_guard = self.buffer_pool.fetch_page_write(bucket_page_id)?;
        let mut bucket = deserialize_bucket::<K>(&bucket_guard)?;

        if !bucket.remove(key) {
            return Ok(false);
        }
        serialize_bucket(&bucket, &mut bucket_guard)?;

        // Iteratively absorb the split partner while one bucket can hold
        // the union of both
        loop {
            let depth = dir.local_depth(bucket_idx);
            if depth == 0 {
                break;
            }

            let merge_mask = 1u32 << (depth - 1);
            let partner_idx = bucket_idx ^ merge_mask as usize;
            if dir.local_depth(partner_idx) != depth {
                break;
            }

            let partner_page_id = dir.bucket_page_id(partner_idx);
            if partner_page_id == INVALID_PAGE_ID || partner_page_id == bucket_page_id {
                break;
            }

            let partner_guard = self.buffer_pool.fetch_page_read(partner_page_id)?;
            let partner = deserialize_bucket::<K>(&partner_guard)?;
            if !bucket.can_absorb(&partner) {
                break;
            }
            bucket.absorb(&partner);
            drop(partner_guard);

            let deleted = self.buffer_pool.delete_page(partner_page_id)?;
            assert!(deleted, "merged bucket page {} still pinned", partner_page_id);

            debug!(
                "merged bucket {} into {} at local depth {}",
                partner_page_id, bucket_page_id, depth
            );

            // The combined group loses a depth bit and every slot in it
            // points at the surviving bucket
            let dir_size = dir.size();
            let step = merge_mask as usize;
            let mut idx = (hash & (merge_mask - 1)) as usize;
            while idx < dir_size {
                dir.decr_local_depth(idx);
                dir.set_bucket_page_id(idx, bucket_page_id);
                idx += step;
            }

            serialize_bucket(&bucket, &mut bucket_guard)?;
        }

        while dir.can_shrink() {
            debug!("shrinking directory to global depth {}", dir.global_depth() - 1);
            dir.decr_global_depth();
        }
        serialize_directory(&dir, &mut dir_guard)?;

        Ok(true)
    }
}
