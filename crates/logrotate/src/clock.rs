//! Time sources for the rotating writer

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, TimeDelta, TimeZone};
use parking_lot::Mutex;

/// Source of the current instant
///
/// The writer samples the clock at most once per write call and compares
/// every boundary against that single value.
pub trait Clock: Send + Sync {
    /// Time zone the instants are expressed in; boundaries follow its wall clock
    type Tz: TimeZone;

    /// Current instant
    fn now(&self) -> DateTime<Self::Tz>;
}

/// Local time in the system time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same instant, so a test can keep one handle and advance
/// time for a writer that owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to a specific instant
    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.now.lock() = at;
    }

    /// Move the clock forward by `delta`
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Clock for ManualClock {
    type Tz = FixedOffset;

    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock()
    }
}
