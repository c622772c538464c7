//! Block handle
//!
//! A checked handle over one pool slot. Not `Clone`: the only way to give a
//! block back is `BlockPool::free(block)`, which consumes it.

/// One fixed-capacity unit of file data
#[derive(Debug)]
pub struct Block {
    /// Id of the pool this block was allocated from
    pub(super) pool_id: u64,

    /// Stable slot index inside the pool
    pub(super) index: usize,

    /// Payload storage, `capacity` bytes long
    pub(super) data: Box<[u8]>,

    /// Valid bytes remaining after `offset`
    len: usize,

    /// Consumption offset inside the payload
    offset: usize,

    /// Storage error forwarded in place of data
    error: Option<std::io::Error>,
}

impl Block {
    pub(super) fn new(pool_id: u64, index: usize, data: Box<[u8]>) -> Self {
        let len = data.len();
        Self {
            pool_id,
            index,
            data,
            len,
            offset: 0,
            error: None,
        }
    }

    /// Reset to a freshly allocated state: full length, zero offset, no error
    pub(super) fn reset(&mut self) {
        self.len = self.data.len();
        self.offset = 0;
        self.error = None;
    }

    /// Slot index inside the owning pool
    pub fn index(&self) -> usize {
        self.index
    }

    /// Full payload capacity
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Valid bytes remaining to consume
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumption offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whole payload area, for the storage read to fill
    pub fn fill_area(&mut self) -> &mut [u8] {
        let end = self.len;
        &mut self.data[..end]
    }

    /// Record how many bytes the storage read produced
    pub fn set_filled(&mut self, n: usize) {
        debug_assert!(n <= self.data.len());
        self.len = n.min(self.data.len());
        self.offset = 0;
    }

    /// Carry a storage error in place of data
    pub fn set_error(&mut self, err: std::io::Error) {
        self.len = 0;
        self.offset = 0;
        self.error = Some(err);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Take the forwarded storage error out of the block
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    /// The unconsumed bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.len]
    }

    /// Mark `n` bytes from the front of the payload as consumed
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.offset += n;
        self.len -= n;
    }

    /// True if the storage read filled the whole payload.
    /// A consumed short block marks end-of-file.
    pub fn is_full(&self) -> bool {
        self.error.is_none() && self.offset + self.len == self.data.len()
    }
}
