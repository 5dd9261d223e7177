use log::debug;
use serde::{Serialize, Deserialize};

use crate::common::types::{Rid, INVALID_PAGE_ID};
use crate::storage::buffer::WritePageGuard;
use crate::index::hash::error::HashIndexError;
use crate::index::hash::hasher::KeyHasher;
use crate::index::hash::page::{HashBucketPage, HashDirectoryPage};
use crate::index::hash::serialization::{
    deserialize_bucket, deserialize_directory, deserialize_header, serialize_bucket,
    serialize_directory, serialize_header,
};
use super::base::ExtendibleHashIndex;

impl<K, H> ExtendibleHashIndex<K, H>
where
    K: Clone + Ord + Serialize + for<'de> Deserialize<'de> + 'static,
    H: KeyHasher<K>,
{
    /// Insert a key/record pair.
    ///
    /// Returns false when the key already exists, or when the bucket is full
    /// and its directory has no routing bits left to split on. Allocation
    /// failure from the pool propagates as an error.
    pub fn insert(&self, key: K, rid: Rid) -> Result<bool, HashIndexError> {
        let _latch = self.latch.write();
        let hash = self.hash(&key);

        let mut header_guard = self.buffer_pool.fetch_page_write(self.header_page_id)?;
        let mut header = deserialize_header(&header_guard)?;

        let dir_idx = header.hash_to_directory_index(hash);
        let dir_page_id = header.directory_page_id(dir_idx);

        // Allocate the directory on first use of this header slot
        let (mut dir_guard, mut dir) = if dir_page_id == INVALID_PAGE_ID {
            let mut guard = self.buffer_pool.new_page_guarded()?.upgrade_write();
            header.set_directory_page_id(dir_idx, guard.page_id());
            serialize_header(&header, &mut header_guard)?;

            let dir = HashDirectoryPage::new(self.directory_max_depth);
            serialize_directory(&dir, &mut guard)?;
            (guard, dir)
        } else {
            let guard = self.buffer_pool.fetch_page_write(dir_page_id)?;
            let dir = deserialize_directory(&guard)?;
            (guard, dir)
        };
        drop(header_guard);

        self.insert_to_directory(&mut dir_guard, &mut dir, hash, key, rid)
    }

    /// Directory-local insert: split-and-retry until the pair lands or the
    /// directory runs out of depth.
    fn insert_to_directory(
        &self,
        dir_guard: &mut WritePageGuard,
        dir: &mut HashDirectoryPage,
        hash: u32,
        key: K,
        rid: Rid,
    ) -> Result<bool, HashIndexError> {
        loop {
            let bucket_idx = dir.hash_to_bucket_index(hash);
            let bucket_page_id = dir.bucket_page_id(bucket_idx);

            let (mut bucket_guard, mut bucket) = if bucket_page_id == INVALID_PAGE_ID {
                // Only a fresh single-slot directory lacks its bucket
                debug_assert!(dir.size() == 1 && bucket_idx == 0);
                let mut guard = self.buffer_pool.new_page_guarded()?.upgrade_write();
                dir.set_bucket_page_id(bucket_idx, guard.page_id());
                serialize_directory(dir, dir_guard)?;

                let bucket = HashBucketPage::new(self.bucket_max_size);
                serialize_bucket(&bucket, &mut guard)?;
                (guard, bucket)
            } else {
                let guard = self.buffer_pool.fetch_page_write(bucket_page_id)?;
                let bucket = deserialize_bucket::<K>(&guard)?;
                (guard, bucket)
            };

            // A duplicate key never triggers a split
            if bucket.lookup(&key).is_some() {
                return Ok(false);
            }

            if !bucket.is_full() {
                let inserted = bucket.insert(key, rid);
                debug_assert!(inserted);
                serialize_bucket(&bucket, &mut bucket_guard)?;
                return Ok(inserted);
            }

            // A full bucket that already uses every routing bit forces the
            // directory to grow first
            if dir.local_depth(bucket_idx) == dir.global_depth() {
                if !dir.can_expand() {
                    debug!(
                        "directory at max depth {}, rejecting insert",
                        dir.global_depth()
                    );
                    return Ok(false);
                }
                dir.incr_global_depth();
            }

            // Split on the next routing bit: entries with the bit set move
            // to a freshly allocated bucket
            let mut new_bucket_guard = self.buffer_pool.new_page_guarded()?.upgrade_write();
            let new_bucket_page_id = new_bucket_guard.page_id();
            let mut new_bucket = HashBucketPage::new(self.bucket_max_size);

            let split_mask = 1u32 << dir.local_depth(bucket_idx);
            let mut i = bucket.size();
            while i > 0 {
                i -= 1;
                let (entry_key, entry_rid) = bucket.entry_at(i).clone();
                if self.hash(&entry_key) & split_mask != 0 {
                    new_bucket.insert(entry_key, entry_rid);
                    bucket.remove_at(i);
                }
            }

            debug!(
                "split bucket {} at local depth {}, new bucket {}",
                bucket_page_id,
                dir.local_depth(bucket_idx),
                new_bucket_page_id
            );

            // Every slot of the old pointer group gains a depth bit; the
            // half with the split bit set re-points to the new bucket
            let dir_size = dir.size();
            let step = split_mask as usize;
            let mut idx = (hash & dir.local_depth_mask(bucket_idx)) as usize;
            while idx < dir_size {
                dir.incr_local_depth(idx);
                if idx & step != 0 {
                    dir.set_bucket_page_id(idx, new_bucket_page_id);
                }
                idx += step;
            }

            serialize_bucket(&bucket, &mut bucket_guard)?;
            serialize_bucket(&new_bucket, &mut new_bucket_guard)?;
            serialize_directory(dir, dir_guard)?;

            // The split may not have freed room for this hash; retry, which
            // may split again until the directory is exhausted
        }
    }
}
