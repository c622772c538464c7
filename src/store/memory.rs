//! In-memory file store
//!
//! Files live in shared byte vectors. Reads can be delayed or made to fail
//! on the Nth call, which makes worker error paths reproducible.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{EntryKind, FileStore, Metadata, OpenMode, StoreFile};

/// Make the Nth read (1-based) on handles of a path fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFault {
    pub on_read: usize,
    pub kind: io::ErrorKind,
}

#[derive(Default)]
struct Inner {
    files: HashMap<PathBuf, Arc<Mutex<Vec<u8>>>>,
    dirs: HashSet<PathBuf>,
    faults: HashMap<PathBuf, ReadFault>,
    read_delay: Option<Duration>,
}

/// Shared in-memory file store; clones see the same files
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,

    /// Read calls issued across all handles
    reads: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .files
            .insert(path.into(), Arc::new(Mutex::new(content.into())));
    }

    /// Register a directory entry
    pub fn insert_dir(&self, path: impl Into<PathBuf>) {
        self.inner.lock().dirs.insert(path.into());
    }

    /// Current content of a file
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let inner = self.inner.lock();
        let file = inner.files.get(path.as_ref())?;
        let data = file.lock().clone();
        Some(data)
    }

    /// Inject a read failure for handles opened after this call
    pub fn fail_read(&self, path: impl Into<PathBuf>, fault: ReadFault) {
        self.inner.lock().faults.insert(path.into(), fault);
    }

    /// Sleep this long inside every read
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.inner.lock().read_delay = delay;
    }

    /// Total read calls served so far
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileStore for MemoryStore {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn StoreFile>> {
        let mut inner = self.inner.lock();

        if inner.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            ));
        }

        let data = match (inner.files.get(path), mode) {
            (Some(data), _) => Arc::clone(data),
            (None, OpenMode::Write { create: true, .. }) => {
                let data = Arc::new(Mutex::new(Vec::new()));
                inner.files.insert(path.to_path_buf(), Arc::clone(&data));
                data
            }
            (None, _) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            }
        };

        let append = matches!(mode, OpenMode::Write { append: true, .. });

        Ok(Box::new(MemoryFile {
            data,
            position: 0,
            append,
            closed: false,
            fault: inner.faults.get(path).copied(),
            delay: inner.read_delay,
            handle_reads: 0,
            store_reads: Arc::clone(&self.reads),
        }))
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let inner = self.inner.lock();

        if inner.dirs.contains(path) {
            return Ok(Metadata {
                kind: EntryKind::Directory,
                size: 0,
            });
        }

        match inner.files.get(path) {
            Some(data) => Ok(Metadata {
                kind: EntryKind::File,
                size: data.lock().len() as u64,
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }
}

/// Open handle from `MemoryStore`
struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
    position: usize,
    append: bool,
    closed: bool,
    fault: Option<ReadFault>,
    delay: Option<Duration>,
    handle_reads: usize,
    store_reads: Arc<AtomicUsize>,
}

impl MemoryFile {
    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "file already closed"));
        }
        Ok(())
    }
}

impl StoreFile for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open()?;
        self.store_reads.fetch_add(1, Ordering::SeqCst);
        self.handle_reads += 1;

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if let Some(fault) = self.fault {
            if fault.on_read == self.handle_reads {
                return Err(io::Error::new(fault.kind, "injected read fault"));
            }
        }

        let data = self.data.lock();
        let start = self.position.min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.position = start + n;

        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;

        let mut data = self.data.lock();
        if self.append {
            self.position = data.len();
        }

        let end = self.position + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.position..end].copy_from_slice(buf);
        self.position = end;

        Ok(buf.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.check_open()?;
        self.data.lock().resize(len as usize, 0);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
