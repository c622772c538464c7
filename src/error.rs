//! Error types for asyncrw
//!
//! Provides a unified error type for all operations, plus the mapping to
//! negative errno-style codes used by callers that speak integer statuses.

use thiserror::Error;

/// Result type alias using AsyncRwError
pub type Result<T> = std::result::Result<T, AsyncRwError>;

// Negative errno values returned by `AsyncRwError::code`
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EBADF: i32 = 9;
const EAGAIN: i32 = 11;
const EINVAL: i32 = 22;
const ENOTSUP: i32 = 95;

/// Unified error type for asyncrw operations
#[derive(Debug, Error)]
pub enum AsyncRwError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// Synchronous I/O failure (stat, open, truncate, write, close)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage read failure forwarded by the worker through the block queue
    #[error("Storage read failed: {0}")]
    Storage(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    // -------------------------------------------------------------------------
    // State Errors
    // -------------------------------------------------------------------------
    /// Operation on a context in the wrong state (closed, undefined, failed)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    // -------------------------------------------------------------------------
    // Flow Errors
    // -------------------------------------------------------------------------
    /// Deadline passed before the request was satisfied.
    /// `copied` bytes were moved into the destination before giving up.
    #[error("Timed out, try again ({copied} bytes copied)")]
    TryAgain { copied: usize },
}

impl AsyncRwError {
    /// Negative errno-style code for this error
    pub fn code(&self) -> i32 {
        match self {
            AsyncRwError::Io(e) | AsyncRwError::Storage(e) => io_code(e),
            AsyncRwError::InvalidArgument(_) => -EINVAL,
            AsyncRwError::NotSupported(_) => -ENOTSUP,
            AsyncRwError::NotAFile(_) => -ENOENT,
            AsyncRwError::InvalidOperation(_) => -EBADF,
            AsyncRwError::TryAgain { .. } => -EAGAIN,
        }
    }

    /// Bytes already copied when the call gave up (timeouts only)
    pub fn bytes_copied(&self) -> usize {
        match self {
            AsyncRwError::TryAgain { copied } => *copied,
            _ => 0,
        }
    }

    /// True if the caller may retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(self, AsyncRwError::TryAgain { .. })
    }
}

/// Map an I/O error onto a negative errno, preferring the OS code
fn io_code(err: &std::io::Error) -> i32 {
    if let Some(raw) = err.raw_os_error() {
        return -raw.abs();
    }

    match err.kind() {
        std::io::ErrorKind::NotFound => -ENOENT,
        std::io::ErrorKind::InvalidInput => -EINVAL,
        std::io::ErrorKind::Unsupported => -ENOTSUP,
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => -EAGAIN,
        _ => -EIO,
    }
}

impl From<AsyncRwError> for std::io::Error {
    fn from(err: AsyncRwError) -> Self {
        use std::io::ErrorKind;

        match err {
            AsyncRwError::Io(e) | AsyncRwError::Storage(e) => e,
            AsyncRwError::InvalidArgument(msg) => std::io::Error::new(ErrorKind::InvalidInput, msg),
            AsyncRwError::NotSupported(msg) => std::io::Error::new(ErrorKind::Unsupported, msg),
            AsyncRwError::NotAFile(msg) => std::io::Error::new(ErrorKind::NotFound, msg),
            AsyncRwError::TryAgain { copied } => std::io::Error::new(
                ErrorKind::WouldBlock,
                format!("timed out after {} bytes", copied),
            ),
            AsyncRwError::InvalidOperation(msg) => std::io::Error::new(ErrorKind::Other, msg),
        }
    }
}
