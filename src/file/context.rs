//! Shared per-file context and the worker read path

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::pool::BlockPool;
use crate::scheduler::{Work, WorkFlags};
use crate::store::StoreFile;

use super::queue::BlockQueue;
use super::semaphore::Semaphore;
use super::{Status, StatusCell};

/// State shared by the consumer and the worker
///
/// ## Concurrency:
/// - `flags`, `status`, `file_final_size`: atomics
/// - `queue`: internal mutex, held only to splice
/// - `file`: mutex held across one storage call; close takes it out
/// - `ready`: counts blocks the consumer may take
pub(crate) struct FileContext {
    pub(crate) flags: WorkFlags,
    pub(crate) status: StatusCell,
    pub(crate) pool: Arc<BlockPool>,
    pub(crate) queue: BlockQueue,
    pub(crate) ready: Semaphore,
    pub(crate) file: Mutex<Option<Box<dyn StoreFile>>>,
    pub(crate) file_final_size: AtomicU64,
}

impl FileContext {
    /// Zeroed context drawing from `pool`
    pub(crate) fn new(pool: Arc<BlockPool>) -> Self {
        let max = pool.block_count();
        Self {
            flags: WorkFlags::new(),
            status: StatusCell::new(),
            pool,
            queue: BlockQueue::new(),
            ready: Semaphore::new(max),
            file: Mutex::new(None),
            file_final_size: AtomicU64::new(0),
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.status.get()
    }

    /// Close the storage handle, if still open
    pub(crate) fn close_file(&self) -> io::Result<()> {
        let file = self.file.lock().take();
        match file {
            Some(mut file) => file.close(),
            None => Ok(()),
        }
    }

    /// Give every queued block back to the pool
    fn reclaim_blocks(&self) {
        for block in self.queue.drain() {
            if let Err(e) = self.pool.free(block) {
                tracing::error!("Failed to return block to pool: {}", e);
            }
        }
    }

    /// One storage read into a fresh block.
    /// Returns false when the activation should stop.
    fn read_step(&self) -> bool {
        let Some(mut block) = self.pool.alloc() else {
            tracing::debug!("No more blocks available, pausing prefetch");
            return false;
        };

        let requested = block.len();
        let result = {
            let mut file = self.file.lock();
            match file.as_mut() {
                Some(file) => Some(file.read(block.fill_area())),
                None => None,
            }
        };

        let Some(result) = result else {
            // Closed between the abort check and the read
            if let Err(e) = self.pool.free(block) {
                tracing::error!("Failed to return block to pool: {}", e);
            }
            return false;
        };

        let keep_going = match result {
            Ok(n) => {
                block.set_filled(n);
                self.file_final_size.fetch_add(n as u64, Ordering::SeqCst);

                if n < requested {
                    tracing::debug!(
                        "Reached end of file after {} bytes",
                        self.file_final_size.load(Ordering::SeqCst)
                    );
                    self.flags.mark_exhausted();
                    false
                } else {
                    true
                }
            }
            Err(e) => {
                tracing::error!("Storage read of {} bytes failed: {}", requested, e);
                block.set_error(e);
                self.flags.mark_exhausted();
                false
            }
        };

        self.queue.push_back(block);
        self.ready.release();

        keep_going
    }
}

impl Work for FileContext {
    fn flags(&self) -> &WorkFlags {
        &self.flags
    }

    /// Refill look-ahead until the pool runs dry, end-of-file, an error,
    /// or an abort request
    fn process(&self) {
        while !self.flags.is_aborted() && !self.flags.is_exhausted() {
            if !self.read_step() {
                break;
            }
        }
    }
}

impl Drop for FileContext {
    fn drop(&mut self) {
        self.reclaim_blocks();
    }
}
