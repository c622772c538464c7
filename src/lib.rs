//! # asyncrw
//!
//! A read-ahead file access engine with:
//! - A fixed-block memory pool capping look-ahead memory
//! - A single shared background worker performing storage reads
//! - Per-file block queues with partial-consumption bookkeeping
//! - Deadline-bounded reads and cooperative close
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Consumer threads                          │
//! │              AsyncFile::read(buf, timeout)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ acquire / pop_front / free
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Async File Context                          │
//! │     status · flags · block queue · ready semaphore           │
//! └──────────┬──────────────────────────────▲───────────────────┘
//!            │ schedule                     │ push_back / release
//!            ▼                              │
//!   ┌─────────────────┐            ┌────────┴────────┐
//!   │   Work Queue    │───────────▶│  Shared Worker  │
//!   │  (crossbeam)    │            │  (one thread)   │
//!   └─────────────────┘            └────────┬────────┘
//!                                           │ alloc / read
//!                              ┌────────────┴────────────┐
//!                              ▼                         ▼
//!                       ┌─────────────┐          ┌─────────────┐
//!                       │ Block Pool  │          │ File Store  │
//!                       └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod timeout;

pub mod pool;
pub mod store;
pub mod scheduler;
pub mod file;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AsyncRwError, Result};
pub use config::{AsyncFileConfig, OpenOptions, SchedulerConfig};
pub use file::{AsyncFile, FileStats, Status};
pub use pool::{BlockPool, BLOCK_HEADER_SIZE};
pub use scheduler::Scheduler;
pub use timeout::Timeout;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of asyncrw
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
