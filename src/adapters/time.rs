//! Clock adapters.
//!
//! - [`SystemClock`] reads the host wall clock.
//! - [`ManualClock`] is set and advanced explicitly; clones share one
//!   instant so a test can hand a copy to every adapter and move time for
//!   all of them at once.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Local, TimeDelta, Utc};

use crate::app::ports::Clock;

/// Host wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Deterministic clock for tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: Rc::new(Cell::new(millis)),
        }
    }

    pub fn at<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> Self {
        Self::at_millis(at.timestamp_millis())
    }

    pub fn advance(&self, by: TimeDelta) {
        self.millis.set(self.millis.get() + by.num_milliseconds());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        DateTime::<Utc>::from_timestamp_millis(self.millis.get())
            .unwrap_or_default()
            .with_timezone(&Local)
    }

    fn now_millis(&self) -> i64 {
        self.millis.get()
    }
}
