use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use log::error;

use crate::common::types::{Page, PageId, PagePtr};
use crate::storage::disk::disk_manager::DiskManager;

/// A single disk request handed to the background worker.
///
/// Every request carries a one-shot completion channel; the worker sends
/// `true` on success and `false` on failure once the synchronous disk call
/// has finished.
pub enum DiskRequest {
    /// Read the given page from disk into the shared page buffer
    Read {
        page_id: PageId,
        page: PagePtr,
        done: Sender<bool>,
    },
    /// Write the snapshot buffer to disk at its page ID
    Write {
        page: Box<Page>,
        done: Sender<bool>,
    },
}

/// Serializes asynchronous page I/O against the disk manager.
///
/// Requests are executed strictly in FIFO order by one background worker
/// thread, so requests submitted from the same thread complete in submission
/// order. Callers await the completion channel returned by the scheduling
/// helpers.
pub struct DiskScheduler {
    sender: Option<Sender<DiskRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Create a scheduler and spawn its worker thread
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = mpsc::channel::<DiskRequest>();

        let worker = std::thread::spawn(move || {
            Self::run_worker(disk_manager, receiver);
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Enqueue a request for the background worker
    pub fn schedule(&self, request: DiskRequest) {
        self.sender
            .as_ref()
            .expect("disk scheduler already shut down")
            .send(request)
            .expect("disk scheduler worker hung up");
    }

    /// Schedule a read of `page_id` into the shared page buffer.
    /// Returns the completion channel to await.
    pub fn schedule_read(&self, page_id: PageId, page: PagePtr) -> Receiver<bool> {
        let (done, completion) = mpsc::channel();
        self.schedule(DiskRequest::Read { page_id, page, done });
        completion
    }

    /// Schedule a write of the snapshot buffer.
    /// Returns the completion channel to await.
    pub fn schedule_write(&self, page: Page) -> Receiver<bool> {
        let (done, completion) = mpsc::channel();
        self.schedule(DiskRequest::Write {
            page: Box::new(page),
            done,
        });
        completion
    }

    fn run_worker(disk_manager: Arc<DiskManager>, receiver: Receiver<DiskRequest>) {
        // Runs until every sender is dropped
        while let Ok(request) = receiver.recv() {
            match request {
                DiskRequest::Read { page_id, page, done } => {
                    let result = {
                        let mut page_guard = page.write();
                        disk_manager.read_page(page_id, &mut page_guard)
                    };
                    if let Err(e) = &result {
                        error!("disk read of page {} failed: {}", page_id, e);
                    }
                    // The submitter may have stopped waiting; ignore send errors
                    let _ = done.send(result.is_ok());
                }
                DiskRequest::Write { page, done } => {
                    let result = disk_manager.write_page(&page);
                    if let Err(e) = &result {
                        error!("disk write of page {} failed: {}", page.page_id, e);
                    }
                    let _ = done.send(result.is_ok());
                }
            }
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        // Hang up the channel so the worker drains and exits
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use tempfile::NamedTempFile;

    const PAGE_SIZE_LAST: usize = crate::common::types::PAGE_SIZE - 1;

    fn create_test_scheduler() -> (DiskScheduler, Arc<DiskManager>, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let disk_manager = Arc::new(DiskManager::new(file.path()).unwrap());
        let scheduler = DiskScheduler::new(Arc::clone(&disk_manager));
        (scheduler, disk_manager, file)
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (scheduler, disk_manager, _file) = create_test_scheduler();

        let page_id = disk_manager.allocate_page().unwrap();
        let mut page = Page::new(page_id);
        page.data[0] = 0xAB;
        page.data[PAGE_SIZE_LAST] = 0xCD;

        assert!(scheduler.schedule_write(page).recv().unwrap());

        let target: PagePtr = Arc::new(RwLock::new(Page::new(0)));
        assert!(scheduler
            .schedule_read(page_id, Arc::clone(&target))
            .recv()
            .unwrap());

        let read_guard = target.read();
        assert_eq!(read_guard.page_id, page_id);
        assert_eq!(read_guard.data[0], 0xAB);
        assert_eq!(read_guard.data[PAGE_SIZE_LAST], 0xCD);
    }

    #[test]
    fn test_requests_complete_in_submission_order() {
        let (scheduler, disk_manager, _file) = create_test_scheduler();

        let page_id = disk_manager.allocate_page().unwrap();

        // Two writes to the same page; the later one must win
        let mut first = Page::new(page_id);
        first.data[10] = 1;
        let mut second = Page::new(page_id);
        second.data[10] = 2;

        let first_done = scheduler.schedule_write(first);
        let second_done = scheduler.schedule_write(second);
        assert!(first_done.recv().unwrap());
        assert!(second_done.recv().unwrap());

        let target: PagePtr = Arc::new(RwLock::new(Page::new(0)));
        assert!(scheduler
            .schedule_read(page_id, Arc::clone(&target))
            .recv()
            .unwrap());
        assert_eq!(target.read().data[10], 2);
    }

    #[test]
    fn test_read_of_invalid_page_reports_failure() {
        let (scheduler, _disk_manager, _file) = create_test_scheduler();

        let target: PagePtr = Arc::new(RwLock::new(Page::new(0)));
        let completion = scheduler.schedule_read(crate::common::types::INVALID_PAGE_ID, target);
        assert!(!completion.recv().unwrap());
    }
}
