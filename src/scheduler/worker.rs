//! Shared worker
//!
//! Drains the work queue on a dedicated thread, or on demand on the
//! caller's thread when built with `Scheduler::manual`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::error::{AsyncRwError, Result};

use super::Work;

/// Messages carried by the work queue
enum Job {
    Run(Arc<dyn Work>),
    Stop,
}

/// Counters shared between the handle and the worker thread
#[derive(Default)]
struct Counters {
    /// Schedule requests that enqueued work
    scheduled: AtomicU64,

    /// Schedule requests dropped (already active, aborted, exhausted, queue full)
    dropped: AtomicU64,

    /// Activations run to completion
    activations: AtomicU64,
}

struct Inner {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    counters: Arc<Counters>,

    /// Worker thread, `None` in manual mode or after shutdown
    worker: Mutex<Option<JoinHandle<()>>>,

    manual: bool,
}

/// Handle to the shared worker
///
/// Cheap to clone; every async file holds one. The worker thread stops when
/// `shutdown` is called or the last handle is dropped.
///
/// ## Concurrency:
/// - `schedule` may be called from any thread
/// - Activations run strictly one at a time, in FIFO order
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Start a scheduler with its own background worker thread
    pub fn spawn(config: SchedulerConfig) -> Result<Self> {
        let inner = Self::build(&config, false);

        let receiver = inner.receiver.clone();
        let counters = Arc::clone(&inner.counters);
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_loop(receiver, counters))?;

        *inner.worker.lock() = Some(handle);

        tracing::debug!("Worker '{}' started", config.thread_name);

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Scheduler without a thread; work runs when `run_once` or
    /// `run_until_idle` is called
    pub fn manual() -> Self {
        Self {
            inner: Arc::new(Self::build(&SchedulerConfig::default(), true)),
        }
    }

    fn build(config: &SchedulerConfig, manual: bool) -> Inner {
        let (sender, receiver) = match config.queue_capacity {
            Some(cap) => channel::bounded(cap),
            None => channel::unbounded(),
        };

        Inner {
            sender,
            receiver,
            counters: Arc::new(Counters::default()),
            worker: Mutex::new(None),
            manual,
        }
    }

    /// Queue `work` for one activation
    ///
    /// Returns false, without queueing, if the work item is already queued
    /// or running, has been aborted or exhausted, or the queue is full.
    pub fn schedule(&self, work: Arc<dyn Work>) -> bool {
        if !work.flags().try_activate() {
            self.inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match self.inner.sender.try_send(Job::Run(Arc::clone(&work))) {
            Ok(()) => {
                self.inner.counters.scheduled.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                tracing::warn!("Work queue unavailable ({}), dropping schedule request", e);
                work.flags().clear_active();
                self.inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Run one queued activation on the calling thread (manual mode only)
    ///
    /// Returns false if the queue was empty.
    pub fn run_once(&self) -> Result<bool> {
        if !self.inner.manual {
            return Err(AsyncRwError::InvalidOperation(
                "run_once on a threaded scheduler".to_string(),
            ));
        }

        match self.inner.receiver.try_recv() {
            Ok(Job::Run(work)) => {
                run_activation(&work, &self.inner.counters);
                Ok(true)
            }
            Ok(Job::Stop) | Err(_) => Ok(false),
        }
    }

    /// Run activations until the queue is empty (manual mode only)
    ///
    /// Returns the number of activations run.
    pub fn run_until_idle(&self) -> Result<usize> {
        let mut count = 0;
        while self.run_once()? {
            count += 1;
        }
        Ok(count)
    }

    /// Work items currently queued
    pub fn queued(&self) -> usize {
        self.inner.receiver.len()
    }

    /// Activations run so far
    pub fn activations(&self) -> u64 {
        self.inner.counters.activations.load(Ordering::SeqCst)
    }

    /// Schedule requests that enqueued work
    pub fn scheduled(&self) -> u64 {
        self.inner.counters.scheduled.load(Ordering::SeqCst)
    }

    /// Schedule requests that were dropped
    pub fn dropped(&self) -> u64 {
        self.inner.counters.dropped.load(Ordering::SeqCst)
    }

    pub fn is_manual(&self) -> bool {
        self.inner.manual
    }

    /// Stop the worker thread after the activations already queued
    pub fn shutdown(&self) {
        self.inner.stop_worker();
    }
}

impl Inner {
    fn stop_worker(&self) {
        let handle = self.worker.lock().take();

        if let Some(handle) = handle {
            // Stop is queued behind pending work; a full bounded queue blocks here
            if let Err(e) = self.sender.send(Job::Stop) {
                tracing::warn!("Failed to queue worker stop: {}", e);
            }
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
            tracing::debug!("Worker stopped");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn worker_loop(receiver: Receiver<Job>, counters: Arc<Counters>) {
    // Idle here until something is queued
    while let Ok(job) = receiver.recv() {
        match job {
            Job::Run(work) => run_activation(&work, &counters),
            Job::Stop => break,
        }
    }
}

fn run_activation(work: &Arc<dyn Work>, counters: &Counters) {
    work.process();
    work.flags().clear_active();
    counters.activations.fetch_add(1, Ordering::SeqCst);
}
