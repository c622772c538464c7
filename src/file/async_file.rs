//! Async file handle
//!
//! The consumer-facing API: open, read with a deadline, write-through,
//! close.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AsyncFileConfig, OpenOptions};
use crate::error::{AsyncRwError, Result};
use crate::pool::BlockPool;
use crate::scheduler::{Scheduler, Work};
use crate::store::{EntryKind, FileStore, OpenMode};
use crate::timeout::{Deadline, Timeout};

use super::context::FileContext;
use super::{FileStats, Status};

/// Longest a blocked reader waits before re-arming the worker
const REARM_INTERVAL: Duration = Duration::from_millis(10);

/// Access plan derived from the open options
struct AccessPlan {
    mode: OpenMode,
    read_size: bool,
    truncate: bool,
}

impl AccessPlan {
    /// Read wins over write; append/create/truncate only modify write
    fn derive(options: OpenOptions) -> Result<Self> {
        if options.contains(OpenOptions::READ) {
            Ok(Self {
                mode: OpenMode::Read,
                read_size: options.contains(OpenOptions::READ_SIZE),
                truncate: false,
            })
        } else if options.contains(OpenOptions::WRITE) {
            Ok(Self {
                mode: OpenMode::Write {
                    append: options.contains(OpenOptions::APPEND),
                    create: options.contains(OpenOptions::CREATE),
                },
                read_size: false,
                truncate: options.contains(OpenOptions::TRUNCATE),
            })
        } else {
            Err(AsyncRwError::NotSupported(format!(
                "options {:#04x} select neither read nor write",
                options.bits()
            )))
        }
    }
}

/// A file read through the shared worker with bounded look-ahead
///
/// ## Concurrency Model
///
/// - **Worker**: fills pool blocks from storage and appends them to the
///   context's queue, one activation at a time across all files
/// - **Consumer**: `read` may be called from any thread; one consumer per
///   file is assumed
/// - **Close**: sets the abort flag and closes the handle without waiting
///   for queued blocks to be consumed
pub struct AsyncFile {
    /// Shared worker
    scheduler: Scheduler,

    /// Storage backend
    store: Arc<dyn FileStore>,

    /// Current context, replaced on every open
    ctx: Option<Arc<FileContext>>,

    /// Options of the current open
    options: OpenOptions,

    /// Path of the current open
    path: PathBuf,

    /// Size recorded by `READ_SIZE`
    file_size: Option<u64>,
}

impl AsyncFile {
    /// Create an `Undefined` context bound to a scheduler and a store
    pub fn new(scheduler: &Scheduler, store: Arc<dyn FileStore>) -> Self {
        Self {
            scheduler: scheduler.clone(),
            store,
            ctx: None,
            options: OpenOptions::empty(),
            path: PathBuf::new(),
            file_size: None,
        }
    }

    /// Create a context and open it in one step
    pub fn opened(
        scheduler: &Scheduler,
        store: Arc<dyn FileStore>,
        config: AsyncFileConfig,
    ) -> Result<Self> {
        let mut file = Self::new(scheduler, store);
        file.open(config)?;
        Ok(file)
    }

    /// Reset the context and open a file with its own block pool
    ///
    /// On open:
    /// 1. Validate the configuration
    /// 2. Reset all state (any previous open is aborted and its blocks reclaimed)
    /// 3. Derive the access mode
    /// 4. Stat the file if `READ_SIZE` is set
    /// 5. Open (and truncate, if asked)
    /// 6. Start prefetching in read mode
    pub fn open(&mut self, config: AsyncFileConfig) -> Result<()> {
        config.validate()?;
        let pool = Arc::new(BlockPool::new(config.block_size, config.block_count)?);
        self.open_with_pool(config, pool)
    }

    /// Like `open`, but draw blocks from a pool shared with other files
    ///
    /// The pool geometry in `config` is ignored.
    pub fn open_with_pool(&mut self, config: AsyncFileConfig, pool: Arc<BlockPool>) -> Result<()> {
        // Step 1: Validate (pool geometry is the pool's own)
        if config.file_path.as_os_str().is_empty() {
            return Err(AsyncRwError::InvalidArgument("empty file path".to_string()));
        }

        // Step 2: Reset
        self.release_context();
        let ctx = Arc::new(FileContext::new(pool));
        self.ctx = Some(Arc::clone(&ctx));
        self.options = config.options;
        self.path = config.file_path.clone();
        self.file_size = None;

        // Step 3: Access mode
        let plan = AccessPlan::derive(config.options)?;

        // Step 4: Size before open
        if plan.read_size {
            self.file_size = Some(self.stat_size()?);
        }

        tracing::info!(
            "Opening {} (opt: {:#04x}, block size: {}, count: {}, size: {:?})",
            self.path.display(),
            config.options.bits(),
            ctx.pool.block_size(),
            ctx.pool.block_count(),
            self.file_size
        );

        // Step 5: Open
        let mut handle = self.store.open(&self.path, plan.mode).map_err(|e| {
            tracing::error!("Failed to open {} [{:?}]: {}", self.path.display(), plan.mode, e);
            AsyncRwError::Io(e)
        })?;

        if plan.truncate {
            handle.truncate(0).map_err(|e| {
                tracing::error!("Failed to truncate {}: {}", self.path.display(), e);
                AsyncRwError::Io(e)
            })?;
        }

        *ctx.file.lock() = Some(handle);

        // Step 6: Prefetch starts eagerly
        if plan.mode == OpenMode::Read {
            self.schedule(&ctx);
        }

        ctx.status.set(Status::Active);
        Ok(())
    }

    fn stat_size(&self) -> Result<u64> {
        let meta = self.store.stat(&self.path).map_err(|e| {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::error!("Failed to stat {}: {}", self.path.display(), e);
            }
            AsyncRwError::Io(e)
        })?;

        if meta.kind != EntryKind::File {
            return Err(AsyncRwError::NotAFile(self.path.display().to_string()));
        }

        Ok(meta.size)
    }

    /// Read up to `buf.len()` bytes, waiting at most `timeout`
    ///
    /// Returns:
    /// - `Ok(n)` with `n == buf.len()` when the request was satisfied
    /// - `Ok(n)` with `n < buf.len()` when end-of-file was reached
    /// - `Ok(0)` on every call after end-of-file
    /// - `Err(TryAgain { copied })` when the deadline passed first; the
    ///   first `copied` bytes of `buf` are valid
    /// - `Err(Storage(_))` when the worker hit a read error; the file is
    ///   unusable afterwards
    pub fn read(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize> {
        if buf.is_empty() {
            return Err(AsyncRwError::InvalidArgument("empty destination".to_string()));
        }

        let ctx = self.context()?;
        match ctx.status() {
            Status::Active => {}
            Status::Eof => return Ok(0),
            other => {
                return Err(AsyncRwError::InvalidOperation(format!(
                    "read on {:?} file",
                    other
                )))
            }
        }

        if !self.options.contains(OpenOptions::READ) {
            return Err(AsyncRwError::InvalidOperation(
                "file not opened for reading".to_string(),
            ));
        }

        let deadline = timeout.deadline();
        let mut copied = 0;

        while copied < buf.len() {
            if !self.wait_ready(ctx, deadline)? {
                tracing::trace!("Read timed out after {} of {} bytes", copied, buf.len());
                return Err(AsyncRwError::TryAgain { copied });
            }

            let Some(mut block) = ctx.queue.pop_front() else {
                return Err(AsyncRwError::InvalidOperation(
                    "ready count without a queued block".to_string(),
                ));
            };

            if let Some(err) = block.take_error() {
                tracing::error!("Read of {} failed: {}", self.path.display(), err);
                ctx.status.set(Status::Error);
                ctx.pool.free(block)?;
                return Err(AsyncRwError::Storage(err));
            }

            let wanted = buf.len() - copied;

            if wanted < block.len() {
                // Partial: keep the rest at the head for the next call
                buf[copied..].copy_from_slice(&block.payload()[..wanted]);
                block.consume(wanted);
                copied += wanted;

                ctx.queue.push_front(block);
                ctx.ready.release();
                break;
            }

            let n = block.len();
            buf[copied..copied + n].copy_from_slice(block.payload());
            block.consume(n);
            copied += n;

            let short = !block.is_full();
            ctx.pool.free(block)?;

            if short {
                tracing::debug!(
                    "End of {} after {} bytes",
                    self.path.display(),
                    ctx.file_final_size.load(Ordering::SeqCst)
                );
                ctx.status.set(Status::Eof);
                return Ok(copied);
            }

            // A block went back to the pool; refill look-ahead
            self.schedule(ctx);
        }

        Ok(copied)
    }

    /// Write `data` straight through to storage
    ///
    /// Writes are not buffered by the worker; this blocks on the store.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let ctx = self.context()?;

        if ctx.status() != Status::Active || !self.options.contains(OpenOptions::WRITE) {
            return Err(AsyncRwError::InvalidOperation(
                "file not open for writing".to_string(),
            ));
        }
        if self.options.contains(OpenOptions::READ) {
            return Err(AsyncRwError::InvalidOperation(
                "file opened for reading".to_string(),
            ));
        }

        let mut file = ctx.file.lock();
        match file.as_mut() {
            Some(file) => Ok(file.write(data)?),
            None => Err(AsyncRwError::InvalidOperation("file handle closed".to_string())),
        }
    }

    /// Close the file
    ///
    /// Sets the abort flag, checked by the worker before each storage read,
    /// then closes the storage handle. Does not wait for the worker.
    pub fn close(&self) -> Result<()> {
        let ctx = self.context()?;

        match ctx.status() {
            Status::Closed => {
                return Err(AsyncRwError::InvalidOperation("already closed".to_string()))
            }
            Status::Undefined => {
                return Err(AsyncRwError::InvalidOperation("not opened".to_string()))
            }
            _ => {}
        }

        ctx.flags.request_abort();
        ctx.status.set(Status::Closed);

        tracing::debug!("Closing {}", self.path.display());
        ctx.close_file()?;
        Ok(())
    }

    /// File size recorded by `READ_SIZE`
    ///
    /// `None` if the option was not requested.
    pub fn file_size(&self) -> Result<Option<u64>> {
        match self.status() {
            Status::Active | Status::Eof | Status::Closed => Ok(self.file_size),
            other => Err(AsyncRwError::InvalidOperation(format!(
                "file size on {:?} file",
                other
            ))),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.status() == Status::Eof
    }

    pub fn status(&self) -> Status {
        self.ctx
            .as_ref()
            .map(|ctx| ctx.status())
            .unwrap_or(Status::Undefined)
    }

    /// Bytes returned by storage so far
    pub fn file_final_size(&self) -> u64 {
        self.ctx
            .as_ref()
            .map(|ctx| ctx.file_final_size.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Snapshot of the context for monitoring and tests
    pub fn stats(&self) -> FileStats {
        match &self.ctx {
            Some(ctx) => FileStats {
                status: ctx.status(),
                queued_blocks: ctx.queue.len(),
                free_blocks: ctx.pool.available(),
                head_offset: ctx.queue.head_offset(),
                file_final_size: ctx.file_final_size.load(Ordering::SeqCst),
                file_size: self.file_size,
            },
            None => FileStats {
                status: Status::Undefined,
                queued_blocks: 0,
                free_blocks: 0,
                head_offset: None,
                file_final_size: 0,
                file_size: None,
            },
        }
    }

    /// Pool the current context draws from
    pub fn pool(&self) -> Option<&Arc<BlockPool>> {
        self.ctx.as_ref().map(|ctx| &ctx.pool)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn context(&self) -> Result<&Arc<FileContext>> {
        self.ctx
            .as_ref()
            .ok_or_else(|| AsyncRwError::InvalidOperation("not opened".to_string()))
    }

    /// Wait for a queued block until `deadline`
    ///
    /// Re-arms the worker every `REARM_INTERVAL`: with a shared pool, an
    /// activation may have stopped on exhaustion while another file held
    /// every block.
    ///
    /// Fails once the file is closed from another thread.
    fn wait_ready(&self, ctx: &Arc<FileContext>, deadline: Deadline) -> Result<bool> {
        loop {
            if ctx.flags.is_aborted() || ctx.status() == Status::Closed {
                return Err(AsyncRwError::InvalidOperation(
                    "file closed while waiting for data".to_string(),
                ));
            }

            // No-op while an activation is queued or running
            self.schedule(ctx);

            if ctx.ready.acquire(deadline.capped(REARM_INTERVAL)) {
                return Ok(true);
            }
            if deadline.has_passed() {
                return Ok(false);
            }
        }
    }

    fn schedule(&self, ctx: &Arc<FileContext>) -> bool {
        let work: Arc<dyn Work> = Arc::clone(ctx) as Arc<dyn Work>;
        self.scheduler.schedule(work)
    }

    /// Abort and close the current context; its blocks return to the pool
    /// once the worker drops its reference
    fn release_context(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.flags.request_abort();
            if let Err(e) = ctx.close_file() {
                tracing::warn!("Failed to close {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for AsyncFile {
    fn drop(&mut self) {
        self.release_context();
    }
}

impl io::Read for &AsyncFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        AsyncFile::read(*self, buf, Timeout::Forever).map_err(io::Error::from)
    }
}

impl io::Read for AsyncFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}
