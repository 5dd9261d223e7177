use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};

use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::storage::buffer::BufferPoolManager;
use crate::index::hash::error::HashIndexError;
use crate::index::hash::hasher::{DefaultKeyHasher, KeyHasher};
use crate::index::hash::page::HashHeaderPage;
use crate::index::hash::serialization::{
    calculate_bucket_capacity, deserialize_bucket, deserialize_directory, deserialize_header,
    serialize_header, MAX_DIRECTORY_DEPTH, MAX_HEADER_DEPTH,
};

/// Disk-resident extendible hash index over the buffer pool.
///
/// A key's 32-bit hash picks a directory page by its top `header_max_depth`
/// bits and a bucket page by its low `global_depth` bits. All page access
/// goes through pool guards; a coarse reader/writer latch on top makes
/// `insert`/`remove` atomic relative to each other and to `get_value`.
pub struct ExtendibleHashIndex<K, H = DefaultKeyHasher> {
    pub(crate) buffer_pool: Arc<BufferPoolManager>,
    pub(crate) header_page_id: PageId,
    pub(crate) directory_max_depth: u32,
    pub(crate) bucket_max_size: u32,
    pub(crate) hasher: H,
    pub(crate) latch: RwLock<()>,
    pub(crate) _phantom: PhantomData<K>,
}

impl<K> ExtendibleHashIndex<K, DefaultKeyHasher>
where
    K: Clone + Ord + Hash + Serialize + for<'de> Deserialize<'de> + 'static,
{
    /// Create an index hashed with the default 32-bit key hash
    pub fn new(
        buffer_pool: Arc<BufferPoolManager>,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self, HashIndexError> {
        Self::with_hasher(
            buffer_pool,
            DefaultKeyHasher,
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        )
    }
}

impl<K, H> ExtendibleHashIndex<K, H>
where
    K: Clone + Ord + Serialize + for<'de> Deserialize<'de> + 'static,
    H: KeyHasher<K>,
{
    /// Create an index with a caller-supplied hash function.
    ///
    /// Allocates and initializes the header page; directories and buckets
    /// are created lazily by the first insert routed to them.
    pub fn with_hasher(
        buffer_pool: Arc<BufferPoolManager>,
        hasher: H,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Result<Self, HashIndexError> {
        assert!(
            header_max_depth <= MAX_HEADER_DEPTH,
            "header depth {} exceeds page capacity",
            header_max_depth
        );
        assert!(
            directory_max_depth <= MAX_DIRECTORY_DEPTH,
            "directory depth {} exceeds page capacity",
            directory_max_depth
        );

        assert!(bucket_max_size > 0, "buckets must hold at least one entry");

        // Clamp so a full bucket always encodes into one page
        let bucket_max_size = bucket_max_size.min(calculate_bucket_capacity::<K>() as u32);

        let mut header_guard = buffer_pool.new_page_guarded()?.upgrade_write();
        let header_page_id = header_guard.page_id();
        let header = HashHeaderPage::new(header_max_depth);
        serialize_header(&header, &mut header_guard)?;
        drop(header_guard);

        Ok(Self {
            buffer_pool,
            header_page_id,
            directory_max_depth,
            bucket_max_size,
            hasher,
            latch: RwLock::new(()),
            _phantom: PhantomData,
        })
    }

    /// Page ID of the index's header page
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    pub(crate) fn hash(&self, key: &K) -> u32 {
        self.hasher.hash_key(key)
    }

    /// Look up the record IDs stored under a key.
    ///
    /// Walks header, directory and bucket under shared latches, releasing
    /// each page before fetching the next. A missing directory or bucket
    /// slot is simply not-found.
    pub fn get_value(&self, key: &K) -> Result<Vec<Rid>, HashIndexError> {
        let _latch = self.latch.read();
        let hash = self.hash(key);

        let header_guard = self.buffer_pool.fetch_page_read(self.header_page_id)?;
        let header = deserialize_header(&header_guard)?;
        drop(header_guard);

        let dir_page_id = header.directory_page_id(header.hash_to_directory_index(hash));
        if dir_page_id == INVALID_PAGE_ID {
            return Ok(Vec::new());
        }

        let dir_guard = self.buffer_pool.fetch_page_read(dir_page_id)?;
        let dir = deserialize_directory(&dir_guard)?;
        drop(dir_guard);

        let bucket_page_id = dir.bucket_page_id(dir.hash_to_bucket_index(hash));
        if bucket_page_id == INVALID_PAGE_ID {
            return Ok(Vec::new());
        }

        let bucket_guard = self.buffer_pool.fetch_page_read(bucket_page_id)?;
        let bucket = deserialize_bucket::<K>(&bucket_guard)?;
        drop(bucket_guard);

        Ok(bucket.lookup(key).map(|rid| vec![rid]).unwrap_or_default())
    }
}
