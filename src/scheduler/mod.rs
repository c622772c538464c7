//! Scheduler Module
//!
//! The single shared worker and its FIFO work queue.
//!
//! ## Responsibilities
//! - Accept "context has pending work" requests from any thread
//! - Run one activation per dequeued context, strictly one at a time
//! - Gate scheduling so a context sits in the queue at most once
//!
//! ## Flag Word
//! ```text
//! ┌─────────┬─────────┬───────────┐
//! │ bit 0   │ bit 1   │ bit 2     │
//! │ ACTIVE  │ ABORT   │ EXHAUSTED │
//! └─────────┴─────────┴───────────┘
//! ```
//! A context is scheduled only by a compare-and-swap from an all-clear
//! word to `ACTIVE`, so an aborted or exhausted context is never queued
//! again, and a queued one is never queued twice.

mod worker;

pub use worker::Scheduler;

use std::sync::atomic::{AtomicU32, Ordering};

/// One unit of work the scheduler can run
pub trait Work: Send + Sync {
    /// Scheduling gate for this work item
    fn flags(&self) -> &WorkFlags;

    /// Run one activation. Called on the worker, never concurrently
    /// with another activation.
    fn process(&self);
}

/// Atomic activity / cancellation word of a context
#[derive(Debug, Default)]
pub struct WorkFlags(AtomicU32);

impl WorkFlags {
    const ACTIVE: u32 = 1 << 0;
    const ABORT: u32 = 1 << 1;
    const EXHAUSTED: u32 = 1 << 2;

    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Set `ACTIVE` if no flag is set. Returns true for the caller that won.
    pub fn try_activate(&self) -> bool {
        self.0
            .compare_exchange(0, Self::ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Cleared by the worker once the activation is over
    pub fn clear_active(&self) {
        self.0.fetch_and(!Self::ACTIVE, Ordering::AcqRel);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire) & Self::ACTIVE != 0
    }

    /// Ask the worker to stop at its next check
    pub fn request_abort(&self) {
        self.0.fetch_or(Self::ABORT, Ordering::AcqRel);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire) & Self::ABORT != 0
    }

    /// No further storage reads: end-of-file or a read error was seen
    pub fn mark_exhausted(&self) {
        self.0.fetch_or(Self::EXHAUSTED, Ordering::AcqRel);
    }

    pub fn is_exhausted(&self) -> bool {
        self.0.load(Ordering::Acquire) & Self::EXHAUSTED != 0
    }
}
