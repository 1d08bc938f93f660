//! Wall-clock sources
//!
//! Instants are offsets from local midnight, the same domain anchors are
//! entered in. A session running across midnight is not supported.

use std::cell::Cell;
use std::time::Duration;

use chrono::Local;

use crate::timeline::parse::time_of_day_offset;

/// Source of the current time of day
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        time_of_day_offset(Local::now().time())
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new(now: Duration) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
