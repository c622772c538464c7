//! Configuration for asyncrw
//!
//! Centralized configuration with sensible defaults.

use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

use crate::error::{AsyncRwError, Result};
use crate::pool::BLOCK_HEADER_SIZE;

/// Option flags for opening an async file
///
/// Read and write are mutually exclusive. Append, create and truncate only
/// modify write mode. `READ_SIZE` only applies to read mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions(u8);

impl OpenOptions {
    /// Read from file
    pub const READ: Self = Self(1 << 0);

    /// Write into file
    pub const WRITE: Self = Self(1 << 1);

    /// Append to file
    pub const APPEND: Self = Self(1 << 2);

    /// Stat the file size before opening it
    pub const READ_SIZE: Self = Self(1 << 3);

    /// Create file if it does not exist
    pub const CREATE: Self = Self(1 << 4);

    /// Truncate file if it exists
    pub const TRUNCATE: Self = Self(1 << 5);

    /// No option set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bitmask
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every flag of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for OpenOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Configuration for opening one async file context
#[derive(Debug, Clone)]
pub struct AsyncFileConfig {
    // -------------------------------------------------------------------------
    // File Configuration
    // -------------------------------------------------------------------------
    /// Path of the file inside the file store
    pub file_path: PathBuf,

    /// Open options
    pub options: OpenOptions,

    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Size of one pool block in bytes, header included.
    /// Must be a multiple of the platform word size.
    pub block_size: usize,

    /// Number of blocks in the pool (maximum look-ahead depth)
    pub block_count: usize,
}

impl Default for AsyncFileConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::new(),
            options: OpenOptions::READ,
            block_size: 512,
            block_count: 4,
        }
    }
}

impl AsyncFileConfig {
    /// Create a new config builder for the given path
    pub fn builder(path: impl Into<PathBuf>) -> AsyncFileConfigBuilder {
        AsyncFileConfigBuilder {
            config: Self {
                file_path: path.into(),
                ..Self::default()
            },
        }
    }

    /// Check pool geometry and path before any I/O is attempted
    pub fn validate(&self) -> Result<()> {
        if self.file_path.as_os_str().is_empty() {
            return Err(AsyncRwError::InvalidArgument("empty file path".to_string()));
        }

        validate_pool_geometry(self.block_size, self.block_count)
    }
}

/// Block size must be word aligned, larger than the header, and the pool non-empty
pub(crate) fn validate_pool_geometry(block_size: usize, block_count: usize) -> Result<()> {
    if block_count == 0 {
        return Err(AsyncRwError::InvalidArgument("block count is zero".to_string()));
    }

    if block_size <= BLOCK_HEADER_SIZE {
        return Err(AsyncRwError::InvalidArgument(format!(
            "block size {} must exceed header size {}",
            block_size, BLOCK_HEADER_SIZE
        )));
    }

    let word = std::mem::size_of::<usize>();
    if block_size % word != 0 {
        return Err(AsyncRwError::InvalidArgument(format!(
            "block size {} is not a multiple of {}",
            block_size, word
        )));
    }

    Ok(())
}

/// Builder for AsyncFileConfig
pub struct AsyncFileConfigBuilder {
    config: AsyncFileConfig,
}

impl AsyncFileConfigBuilder {
    /// Replace the option set
    pub fn options(mut self, options: OpenOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Set the block size (in bytes, header included)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the block size from the usable payload per block
    pub fn payload_size(mut self, payload: usize) -> Self {
        self.config.block_size = payload + BLOCK_HEADER_SIZE;
        self
    }

    /// Set the number of blocks in the pool
    pub fn block_count(mut self, count: usize) -> Self {
        self.config.block_count = count;
        self
    }

    pub fn build(self) -> AsyncFileConfig {
        self.config
    }
}

/// Configuration for the background worker
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Name given to the worker thread
    pub thread_name: String,

    /// Work queue capacity. `None` means unbounded.
    /// A context occupies at most one slot at a time.
    pub queue_capacity: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: "asyncrw-worker".to_string(),
            queue_capacity: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config builder
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

/// Builder for SchedulerConfig
#[derive(Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Set the worker thread name
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Bound the work queue
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}
