use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use log::debug;

use crate::common::types::{Frame, FrameId, Page, PageId, PagePtr, INVALID_PAGE_ID};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::guard::{PageGuard, ReadPageGuard, WritePageGuard};
use crate::storage::buffer::replacer::LruKReplacer;
use crate::storage::disk::{DiskManager, DiskScheduler};

/// Structural pool state, serialized by the pool latch.
///
/// The latch is held across disk awaits in the fetch/new/flush paths. That
/// is a deliberate simplification: a single slow request stalls the other
/// pool users, but no in-transit bookkeeping is needed.
struct PoolInner {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: LruKReplacer,
}

/// The buffer pool manager maps page IDs to in-memory frames, coordinating
/// eviction, write-back and concurrent fetch/new/flush/delete.
pub struct BufferPoolManager {
    pool_size: usize,
    inner: Mutex<PoolInner>,
    disk_scheduler: DiskScheduler,
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    pub fn new(
        pool_size: usize,
        db_path: impl AsRef<Path>,
        replacer_k: usize,
    ) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        let disk_scheduler = DiskScheduler::new(Arc::clone(&disk_manager));

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = i as FrameId;
            let page: PagePtr = Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID)));
            frames.push(Frame::new(frame_id, page));
            free_list.push_back(frame_id);
        }

        Ok(Self {
            pool_size,
            inner: Mutex::new(PoolInner {
                frames,
                page_table: HashMap::new(),
                free_list,
                replacer: LruKReplacer::new(pool_size, replacer_k),
            }),
            disk_scheduler,
            disk_manager,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Allocate a fresh page and pin it in a frame.
    ///
    /// A frame comes from the free list when possible, otherwise from the
    /// replacer; a dirty victim is written back through the scheduler before
    /// the frame is reused.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut inner = self.inner.lock();

        let frame_id = self.claim_frame(&mut inner)?;
        let page_id = self.disk_manager.allocate_page()?;

        let frame = &mut inner.frames[frame_id as usize];
        {
            let mut page_guard = frame.page.write();
            page_guard.reset();
            page_guard.page_id = page_id;
        }
        frame.pin_count = 1;
        frame.is_dirty = false;
        let page = Arc::clone(&frame.page);

        inner.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id);
        inner.replacer.set_evictable(frame_id, false);

        Ok((page, page_id))
    }

    /// Fetch a page, reading it from disk if it is not resident
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::PageNotFound(page_id));
        }

        let mut inner = self.inner.lock();

        // Already resident: pin and return
        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &mut inner.frames[frame_id as usize];
            frame.pin_count += 1;
            let page = Arc::clone(&frame.page);
            inner.replacer.record_access(frame_id);
            inner.replacer.set_evictable(frame_id, false);
            return Ok(page);
        }

        // Claim a frame and read the page into it
        let frame_id = self.claim_frame(&mut inner)?;
        let frame = &mut inner.frames[frame_id as usize];
        let page = Arc::clone(&frame.page);

        let completion = self.disk_scheduler.schedule_read(page_id, Arc::clone(&page));
        if !completion.recv().unwrap_or(false) {
            // Put the frame back rather than leaving it orphaned
            frame.pin_count = 0;
            frame.is_dirty = false;
            frame.page.write().reset();
            inner.free_list.push_back(frame_id);
            return Err(BufferPoolError::DiskRequestFailed(page_id));
        }

        let frame = &mut inner.frames[frame_id as usize];
        frame.pin_count = 1;
        frame.is_dirty = false;

        inner.page_table.insert(page_id, frame_id);
        inner.replacer.record_access(frame_id);
        inner.replacer.set_evictable(frame_id, false);

        Ok(page)
    }

    /// Drop one pin on a page, OR-ing in the caller's dirty flag.
    ///
    /// Returns false if the page is not resident or was not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };

        let frame = &mut inner.frames[frame_id as usize];
        if frame.pin_count == 0 {
            return false;
        }

        frame.pin_count -= 1;
        frame.is_dirty |= is_dirty;
        if frame.pin_count == 0 {
            inner.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Write a page's current contents to disk, regardless of its dirty
    /// flag. Returns false if the page is not resident.
    ///
    /// The snapshot is taken through the page's shared latch while the pool
    /// latch is held, so a flush must not target a page whose exclusive
    /// latch the calling thread (or a thread waiting on the pool) holds.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let mut inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };

        self.flush_frame(&mut inner.frames[frame_id as usize])?;
        Ok(true)
    }

    /// Flush every resident page under one latch acquisition
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let mut inner = self.inner.lock();

        let frame_ids: Vec<FrameId> = inner.page_table.values().copied().collect();
        for frame_id in frame_ids {
            self.flush_frame(&mut inner.frames[frame_id as usize])?;
        }
        Ok(())
    }

    /// Discard a page from the pool and return its ID to the disk manager.
    ///
    /// Returns true if the page is gone afterwards (including "was never
    /// resident"), false if a pin keeps it alive. No write-back happens:
    /// dirty contents of a deleted page are dropped.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let mut inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };

        let frame = &mut inner.frames[frame_id as usize];
        if frame.pin_count > 0 {
            return Ok(false);
        }

        frame.is_dirty = false;
        frame.pin_count = 0;
        frame.page.write().reset();

        inner.page_table.remove(&page_id);
        inner.replacer.remove(frame_id);
        inner.free_list.push_back(frame_id);

        self.disk_manager.deallocate_page(page_id)?;
        Ok(true)
    }

    /// Fetch a page behind a pin-only guard
    pub fn fetch_page_basic(self: &Arc<Self>, page_id: PageId) -> Result<PageGuard, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageGuard::new(Arc::clone(self), page, page_id))
    }

    /// Fetch a page and take its latch shared.
    ///
    /// The page latch is acquired only after the pool latch has been
    /// released, which keeps the latch order pool-then-page.
    pub fn fetch_page_read(self: &Arc<Self>, page_id: PageId) -> Result<ReadPageGuard, BufferPoolError> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_read())
    }

    /// Fetch a page and take its latch exclusive
    pub fn fetch_page_write(self: &Arc<Self>, page_id: PageId) -> Result<WritePageGuard, BufferPoolError> {
        Ok(self.fetch_page_basic(page_id)?.upgrade_write())
    }

    /// Allocate a fresh page behind a pin-only guard
    pub fn new_page_guarded(self: &Arc<Self>) -> Result<PageGuard, BufferPoolError> {
        let (page, page_id) = self.new_page()?;
        Ok(PageGuard::new(Arc::clone(self), page, page_id))
    }

    /// Current pin count of a resident page (mainly for tests and debugging)
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.inner.lock();
        let &frame_id = inner.page_table.get(&page_id)?;
        Some(inner.frames[frame_id as usize].pin_count)
    }

    /// Obtain a usable frame: free list first, then eviction. A dirty
    /// victim is written back synchronously before its frame is handed out.
    fn claim_frame(&self, inner: &mut PoolInner) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = inner.replacer.evict().ok_or(BufferPoolError::NoFreeFrames)?;

        let frame = &mut inner.frames[frame_id as usize];
        let old_page_id = frame.page.read().page_id;
        debug!("evicting page {} from frame {}", old_page_id, frame_id);

        if frame.is_dirty {
            let snapshot = frame.page.read().clone();
            let completion = self.disk_scheduler.schedule_write(snapshot);
            if !completion.recv().unwrap_or(false) {
                return Err(BufferPoolError::DiskRequestFailed(old_page_id));
            }
            frame.is_dirty = false;
        }

        if old_page_id != INVALID_PAGE_ID {
            inner.page_table.remove(&old_page_id);
        }

        Ok(frame_id)
    }

    /// Write a frame's page out through the scheduler and clear its dirty
    /// flag. Called with the pool latch held.
    fn flush_frame(&self, frame: &mut Frame) -> Result<(), BufferPoolError> {
        let snapshot = frame.page.read().clone();
        let page_id = snapshot.page_id;

        let completion = self.disk_scheduler.schedule_write(snapshot);
        if !completion.recv().unwrap_or(false) {
            return Err(BufferPoolError::DiskRequestFailed(page_id));
        }

        frame.is_dirty = false;
        Ok(())
    }
}
