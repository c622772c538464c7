//! Timeouts and deadlines
//!
//! A `Timeout` is what the caller asks for; a `Deadline` is the absolute
//! monotonic instant derived from it once, at the start of a call.

use std::time::{Duration, Instant};

/// How long a consumer call may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Never block
    NoWait,

    /// Block until the request is satisfied or end-of-file
    Forever,

    /// Block at most this long
    After(Duration),
}

impl Timeout {
    /// Bounded timeout in milliseconds. Zero is the same as `NoWait`.
    pub fn millis(ms: u64) -> Self {
        if ms == 0 {
            Timeout::NoWait
        } else {
            Timeout::After(Duration::from_millis(ms))
        }
    }

    /// Fix the deadline relative to now
    pub fn deadline(self) -> Deadline {
        match self {
            Timeout::NoWait => Deadline::Immediate,
            Timeout::Forever => Deadline::Never,
            Timeout::After(d) if d.is_zero() => Deadline::Immediate,
            Timeout::After(d) => match Instant::now().checked_add(d) {
                Some(at) => Deadline::At(at),
                None => Deadline::Never,
            },
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Timeout::NoWait
        } else {
            Timeout::After(d)
        }
    }
}

/// Absolute point in time after which waiting stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Immediate,
    Never,
    At(Instant),
}

impl Deadline {
    /// The earlier of this deadline and `max` from now
    pub fn capped(self, max: Duration) -> Deadline {
        let cap = Instant::now().checked_add(max);
        match (self, cap) {
            (Deadline::Immediate, _) => Deadline::Immediate,
            (Deadline::Never, Some(cap)) => Deadline::At(cap),
            (Deadline::At(at), Some(cap)) => Deadline::At(at.min(cap)),
            (other, None) => other,
        }
    }

    pub fn has_passed(&self) -> bool {
        match self {
            Deadline::Immediate => true,
            Deadline::Never => false,
            Deadline::At(at) => Instant::now() >= *at,
        }
    }
}
