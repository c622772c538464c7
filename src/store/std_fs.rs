//! `std::fs` backed file store

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::{EntryKind, FileStore, Metadata, OpenMode, StoreFile};

/// File store over the local filesystem
///
/// Relative paths are resolved against `root` when one is set.
#[derive(Debug, Clone, Default)]
pub struct StdFileStore {
    root: Option<PathBuf>,
}

impl StdFileStore {
    /// Store resolving paths as given
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Store resolving relative paths under `root`
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl FileStore for StdFileStore {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn StoreFile>> {
        let path = self.resolve(path);

        let file = match mode {
            OpenMode::Read => File::open(&path)?,
            OpenMode::Write { append, create } => fs::OpenOptions::new()
                .write(true)
                .append(append)
                .create(create)
                .open(&path)?,
        };

        Ok(Box::new(StdFile { file: Some(file) }))
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let meta = fs::metadata(self.resolve(path))?;

        let kind = if meta.is_file() {
            EntryKind::File
        } else if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        };

        Ok(Metadata {
            kind,
            size: meta.len(),
        })
    }
}

/// Open handle from `StdFileStore`
struct StdFile {
    /// `None` once closed
    file: Option<File>,
}

impl StdFile {
    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "file already closed"))
    }
}

impl StoreFile for StdFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let file = self.file()?;

        // `File::read` may return short before end-of-file; keep going
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write_all(buf)?;
        Ok(buf.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file()?.set_len(len)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}
