use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{Page, PageId, INVALID_PAGE_ID, PAGE_SIZE};

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
}

/// Everything behind the lock: the backing file, how far it extends, and
/// the allocation cursor.
struct DiskState {
    file: File,
    /// Bytes the file actually covers; writes past it extend the file
    byte_len: u64,
    next_page_id: PageId,
}

/// File-backed page store.
///
/// Each page lives at a fixed offset keyed by its ID. Allocation only
/// advances a counter; the file grows when a page is first written, and an
/// allocated-but-never-written page reads back as zeros.
pub struct DiskManager {
    state: Mutex<DiskState>,
}

impl DiskManager {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, DiskManagerError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_path)?;

        // Pick up where an existing file left off
        let byte_len = file.metadata()?.len();
        let next_page_id = (byte_len / PAGE_SIZE as u64) as PageId + 1;

        Ok(Self {
            state: Mutex::new(DiskState {
                file,
                byte_len,
                next_page_id,
            }),
        })
    }

    /// Fill `page` with the on-disk content of `page_id`
    pub fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), DiskManagerError> {
        let offset = Self::offset_of(page_id)?;

        let mut state = self.state.lock();
        if offset >= state.byte_len {
            // Allocated but never written
            page.data.fill(0);
        } else {
            state.file.seek(SeekFrom::Start(offset))?;
            state.file.read_exact(&mut page.data)?;
        }
        page.page_id = page_id;

        Ok(())
    }

    /// Write `page` out at the offset its ID dictates, growing the file if
    /// this is the page's first write
    pub fn write_page(&self, page: &Page) -> Result<(), DiskManagerError> {
        let offset = Self::offset_of(page.page_id)?;

        let mut state = self.state.lock();
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.write_all(&page.data)?;
        state.file.flush()?;
        state.byte_len = state.byte_len.max(offset + PAGE_SIZE as u64);

        Ok(())
    }

    /// Hand out the next page ID.
    ///
    /// IDs grow monotonically and are never reissued while this manager is
    /// open; the file itself only grows once the page is written.
    pub fn allocate_page(&self) -> Result<PageId, DiskManagerError> {
        let mut state = self.state.lock();
        let page_id = state.next_page_id;
        state.next_page_id += 1;
        Ok(page_id)
    }

    /// Return a page ID to the disk manager.
    ///
    /// Identifier bookkeeping only: the page's slot stays where it is and
    /// the allocation cursor never moves backwards, so the ID will not be
    /// handed out again.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<(), DiskManagerError> {
        Self::offset_of(page_id)?;
        Ok(())
    }

    /// Byte position of a page, rejecting the reserved ID
    fn offset_of(page_id: PageId) -> Result<u64, DiskManagerError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }
        Ok(u64::from(page_id - 1) * PAGE_SIZE as u64)
    }
}
