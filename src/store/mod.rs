//! File Store Module
//!
//! The synchronous storage collaborator the engine reads through.
//!
//! ## Responsibilities
//! - Open a path with a derived mode
//! - Stat a path (size + entry kind)
//! - Blocking read/write/truncate/close on an open handle
//!
//! ## Implementations
//! - `StdFileStore`: `std::fs`, optionally rooted at a directory
//! - `MemoryStore`: in-memory files with fault injection, for tests and demos

mod std_fs;
mod memory;

pub use std_fs::StdFileStore;
pub use memory::{MemoryStore, ReadFault};

use std::io;
use std::path::Path;

/// Access mode derived from the open options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write { append: bool, create: bool },
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,

    /// Device, FIFO, socket or anything else that is not a regular file
    Other,
}

/// Result of a stat call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
    pub size: u64,
}

/// A storage backend that can open files by path
pub trait FileStore: Send + Sync {
    /// Open `path` with the given mode
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn StoreFile>>;

    /// Stat `path`. A missing entry is `ErrorKind::NotFound`.
    fn stat(&self, path: &Path) -> io::Result<Metadata>;
}

/// An open file inside a store
///
/// Handles move between the consumer thread and the worker, hence `Send`.
pub trait StoreFile: Send {
    /// Fill `buf` from the current position.
    ///
    /// Returns fewer bytes than `buf.len()` only at end-of-file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf` at the current position
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Set the file length
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Flush and release the handle
    fn close(&mut self) -> io::Result<()>;
}
