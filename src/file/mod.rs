//! Async File Module
//!
//! Per-open-file context coordinating the worker and the consumer.
//!
//! ## Responsibilities
//! - Open a file through a `FileStore` and start prefetching
//! - Worker side: fill pool blocks from storage, queue them in order
//! - Consumer side: copy queued bytes out, honour deadlines, re-arm the worker
//! - Close/abort cooperatively
//!
//! ## State Machine
//! ```text
//!   Undefined ──open──▶ Active ──short block consumed──▶ Eof
//!                         │  │                            │
//!                         │  └──forwarded read error──▶ Error
//!                         │                               │
//!                         └──────────close────────────────┴──▶ Closed
//! ```
//!
//! ## Data Flow
//! ```text
//!   open ──schedule──▶ [work queue] ──▶ worker: alloc, read, push_back, release
//!                                                            │
//!   read ◀── acquire ◀── [block queue] ◀─────────────────────┘
//!     └── block fully consumed: free to pool, schedule again
//! ```

mod async_file;
mod context;
mod queue;
mod semaphore;

pub use async_file::AsyncFile;

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of an async file context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Freshly reset, not opened
    Undefined = 0,

    /// Opened, eligible for read/write
    Active = 1,

    /// Short block consumed; further reads return 0
    Eof = 2,

    /// Closed by the user
    Closed = 3,

    /// Storage error surfaced to the consumer
    Error = 4,
}

impl Status {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Status::Active,
            2 => Status::Eof,
            3 => Status::Closed,
            4 => Status::Error,
            _ => Status::Undefined,
        }
    }
}

/// Status shared between threads
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Status::Undefined as u8))
    }

    pub(crate) fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: Status) {
        self.0.store(status as u8, Ordering::Release);
    }
}

/// Point-in-time view of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub status: Status,

    /// Filled blocks waiting for the consumer
    pub queued_blocks: usize,

    /// Free blocks left in the pool
    pub free_blocks: usize,

    /// Offset of the unconsumed data in the head block
    pub head_offset: Option<usize>,

    /// Bytes returned by storage so far
    pub file_final_size: u64,

    /// Size recorded by `READ_SIZE`, if requested
    pub file_size: Option<u64>,
}
