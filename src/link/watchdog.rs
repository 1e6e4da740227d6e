//! Link inactivity watchdog.
//!
//! The handler must call `feed()` for every complete record it receives.
//! Once more than the window passes without a feed the link is considered
//! lost and the handler exits so the supervisor can restart it.

pub struct LinkWatchdog {
    window_ms: i64,
    last_feed_ms: i64,
}

impl LinkWatchdog {
    pub fn new(window_secs: u64, now_ms: i64) -> Self {
        Self {
            window_ms: i64::try_from(window_secs).unwrap_or(i64::MAX / 1000) * 1000,
            last_feed_ms: now_ms,
        }
    }

    pub fn feed(&mut self, now_ms: i64) {
        self.last_feed_ms = now_ms;
    }

    /// Strictly more than the window has passed since the last feed.
    pub fn expired(&self, now_ms: i64) -> bool {
        now_ms - self.last_feed_ms > self.window_ms
    }

    pub fn window_secs(&self) -> u64 {
        (self.window_ms / 1000) as u64
    }
}
