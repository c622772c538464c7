//! Fixed-block pool implementation
//!
//! Slots are pre-allocated and parked in a lock-free bounded queue.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;

use crate::config::validate_pool_geometry;
use crate::error::{AsyncRwError, Result};

use super::{Block, BLOCK_HEADER_SIZE};

/// Source of unique pool ids, used to reject foreign blocks in `free`
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Fixed-size block allocator
///
/// ## Concurrency:
/// - `free_list`: lock-free `ArrayQueue`, sized to `block_count`
/// - `alloc`/`free` never block; `alloc` returns `None` when exhausted
/// - Safe to share across contexts behind an `Arc`
pub struct BlockPool {
    /// Unique id stamped into every block handed out
    id: u64,

    /// Block size in bytes, header included
    block_size: usize,

    /// Total number of blocks
    block_count: usize,

    /// Blocks currently free
    free_list: ArrayQueue<Block>,
}

impl BlockPool {
    /// Create a pool of `block_count` blocks of `block_size` bytes each
    ///
    /// `block_size` must be a multiple of the word size and larger than
    /// `BLOCK_HEADER_SIZE`; `block_count` must be non-zero.
    pub fn new(block_size: usize, block_count: usize) -> Result<Self> {
        validate_pool_geometry(block_size, block_count)?;

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let payload = block_size - BLOCK_HEADER_SIZE;

        let free_list = ArrayQueue::new(block_count);
        for index in 0..block_count {
            let data = vec![0u8; payload].into_boxed_slice();
            // Capacity equals block_count, so this cannot overflow
            let _ = free_list.push(Block::new(id, index, data));
        }

        tracing::trace!(
            "Pool {} created: {} blocks of {} bytes ({} payload)",
            id,
            block_count,
            block_size,
            payload
        );

        Ok(Self {
            id,
            block_size,
            block_count,
            free_list,
        })
    }

    /// Take a free block, or `None` if the pool is exhausted
    ///
    /// The block comes back with `len` set to the full payload capacity and
    /// `offset` zero.
    pub fn alloc(&self) -> Option<Block> {
        let mut block = self.free_list.pop()?;
        block.reset();
        Some(block)
    }

    /// Return a block to the pool
    ///
    /// Fails if the block was allocated from another pool.
    pub fn free(&self, block: Block) -> Result<()> {
        if block.pool_id != self.id {
            return Err(AsyncRwError::InvalidArgument(format!(
                "block {} belongs to pool {}, not {}",
                block.index, block.pool_id, self.id
            )));
        }

        self.free_list.push(block).map_err(|b| {
            AsyncRwError::InvalidArgument(format!("pool {} overflow on block {}", self.id, b.index))
        })
    }

    /// Usable bytes per block
    pub fn payload_capacity(&self) -> usize {
        self.block_size - BLOCK_HEADER_SIZE
    }

    /// Block size in bytes, header included
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of blocks currently free
    pub fn available(&self) -> usize {
        self.free_list.len()
    }
}

impl std::fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockPool")
            .field("id", &self.id)
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("available", &self.available())
            .finish()
    }
}
