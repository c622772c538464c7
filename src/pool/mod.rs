//! Block Pool Module
//!
//! Fixed-block memory pool backing the read-ahead buffers.
//!
//! ## Responsibilities
//! - Pre-allocate `block_count` blocks of `block_size` bytes up front
//! - O(1), never-blocking alloc/free
//! - Signal exhaustion (backpressure) instead of growing
//!
//! ## Block Layout
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ block_size                                     │
//! │ ┌──────────────┬─────────────────────────────┐ │
//! │ │ Header (16)  │  Payload (block_size - 16)  │ │
//! │ └──────────────┴─────────────────────────────┘ │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! The header is accounted for so that `block_size * block_count` stays the
//! real memory budget; the bookkeeping itself lives in the `Block` handle.

mod block;
mod slab;

pub use block::Block;
pub use slab::BlockPool;

/// Bytes of each block reserved for bookkeeping (link, len, offset)
pub const BLOCK_HEADER_SIZE: usize = 16;
