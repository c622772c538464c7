//! Block queue
//!
//! FIFO of filled blocks shared by the worker (push_back) and the consumer
//! (pop_front, push_front for a partially consumed head). The lock is only
//! held for the splice.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::pool::Block;

#[derive(Debug, Default)]
pub(crate) struct BlockQueue {
    blocks: Mutex<VecDeque<Block>>,
}

impl BlockQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a block produced by the worker
    pub(crate) fn push_back(&self, block: Block) {
        self.blocks.lock().push_back(block);
    }

    /// Remove the head block
    pub(crate) fn pop_front(&self) -> Option<Block> {
        self.blocks.lock().pop_front()
    }

    /// Put a partially consumed head back in front
    pub(crate) fn push_front(&self, block: Block) {
        self.blocks.lock().push_front(block);
    }

    /// Consumption offset of the head block
    pub(crate) fn head_offset(&self) -> Option<usize> {
        self.blocks.lock().front().map(|b| b.offset())
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Take every queued block out, in order
    pub(crate) fn drain(&self) -> Vec<Block> {
        self.blocks.lock().drain(..).collect()
    }
}
