use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::RawRwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};

use crate::common::types::{Page, PageId, PagePtr};
use crate::storage::buffer::manager::BufferPoolManager;

type PageReadLatch = ArcRwLockReadGuard<RawRwLock, Page>;
type PageWriteLatch = ArcRwLockWriteGuard<RawRwLock, Page>;

/// Pin-only guard over a fetched page.
///
/// Holding the guard keeps the page resident; dropping it releases exactly
/// the one pin the guard owns, forwarding any dirtiness accumulated through
/// `write()`. The guard is movable and non-copyable; it can be upgraded into
/// a latched guard, which transfers the pin and empties this one.
pub struct PageGuard {
    pool: Arc<BufferPoolManager>,
    page: Option<PagePtr>,
    page_id: PageId,
    is_dirty: bool,
}

impl PageGuard {
    pub(crate) fn new(pool: Arc<BufferPoolManager>, page: PagePtr, page_id: PageId) -> Self {
        Self {
            pool,
            page: Some(page),
            page_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Borrow the page through its latch, shared
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.as_ref().expect("guard already released").read()
    }

    /// Borrow the page through its latch, exclusive, marking the guard dirty
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.is_dirty = true;
        self.page.as_ref().expect("guard already released").write()
    }

    /// Convert into a read guard, taking the page latch shared.
    /// The pin moves to the new guard; this guard becomes empty.
    pub fn upgrade_read(mut self) -> ReadPageGuard {
        let page = self.page.take().expect("guard already released");
        let latch = page.read_arc();
        ReadPageGuard {
            pool: Arc::clone(&self.pool),
            page_id: self.page_id,
            is_dirty: self.is_dirty,
            latch: Some(latch),
        }
    }

    /// Convert into a write guard, taking the page latch exclusive.
    /// The pin moves to the new guard; this guard becomes empty.
    pub fn upgrade_write(mut self) -> WritePageGuard {
        let page = self.page.take().expect("guard already released");
        let latch = page.write_arc();
        WritePageGuard {
            pool: Arc::clone(&self.pool),
            page_id: self.page_id,
            is_dirty: self.is_dirty,
            latch: Some(latch),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            drop(page);
            // Unpin failure is a caller bug elsewhere; nothing to do here
            self.pool.unpin_page(self.page_id, self.is_dirty);
        }
    }
}

/// Guard owning one pin plus the page latch in shared mode
pub struct ReadPageGuard {
    pool: Arc<BufferPoolManager>,
    page_id: PageId,
    is_dirty: bool,
    latch: Option<PageReadLatch>,
}

impl ReadPageGuard {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for ReadPageGuard {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.latch.as_ref().expect("guard already released")
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Latch first, pin second
        self.latch.take();
        self.pool.unpin_page(self.page_id, self.is_dirty);
    }
}

/// Guard owning one pin plus the page latch in exclusive mode.
/// Any mutable access marks the page dirty for the final unpin.
pub struct WritePageGuard {
    pool: Arc<BufferPoolManager>,
    page_id: PageId,
    is_dirty: bool,
    latch: Option<PageWriteLatch>,
}

impl WritePageGuard {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for WritePageGuard {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.latch.as_ref().expect("guard already released")
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Page {
        self.is_dirty = true;
        self.latch.as_mut().expect("guard already released")
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        // Latch first, pin second
        self.latch.take();
        self.pool.unpin_page(self.page_id, self.is_dirty);
    }
}
