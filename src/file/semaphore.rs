//! Counting semaphore with deadlines
//!
//! Tracks how many queued blocks the consumer may take. The count saturates
//! at `max`, the pool's block count.

use parking_lot::{Condvar, Mutex};

use crate::timeout::Deadline;

#[derive(Debug)]
pub(crate) struct Semaphore {
    count: Mutex<usize>,
    max: usize,
    available: Condvar,
}

impl Semaphore {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            count: Mutex::new(0),
            max,
            available: Condvar::new(),
        }
    }

    /// Give one permit back; saturates at `max`
    pub(crate) fn release(&self) {
        let mut count = self.count.lock();
        if *count < self.max {
            *count += 1;
        }
        self.available.notify_one();
    }

    /// Take one permit, waiting until `deadline`.
    /// Returns false if none became available in time.
    pub(crate) fn acquire(&self, deadline: Deadline) -> bool {
        let mut count = self.count.lock();

        loop {
            if *count > 0 {
                *count -= 1;
                return true;
            }

            match deadline {
                Deadline::Immediate => return false,
                Deadline::Never => self.available.wait(&mut count),
                Deadline::At(at) => {
                    if self.available.wait_until(&mut count, at).timed_out() {
                        if *count > 0 {
                            *count -= 1;
                            return true;
                        }
                        return false;
                    }
                }
            }
        }
    }

    pub(crate) fn count(&self) -> usize {
        *self.count.lock()
    }
}
