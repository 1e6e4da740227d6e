//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlEngine / SerialProtocolHandler (domain)
//! ```
//!
//! Driven adapters (channel store, clock, daylight oracle, serial link,
//! event sinks) implement these traits. The domain consumes them via
//! generics, so neither process touches a file, a port or the wall clock
//! directly.

use chrono::{DateTime, Local};

use crate::error::StoreError;

// ───────────────────────────────────────────────────────────────
// Channel store port (shared state between the two processes)
// ───────────────────────────────────────────────────────────────

/// Key-value store with per-key TTL.
///
/// Values are strings. An expired key is indistinguishable from an absent
/// key for every operation. There are no multi-key transactions; writers
/// rely on last-write-wins.
pub trait ChannelStore {
    /// Current value, `None` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store without TTL.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Store with a TTL in seconds.
    fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// Store with a TTL only if the key is absent. Returns `true` when set.
    fn set_nx_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    /// Remove a key. Returns `true` if a live key was removed.
    fn delete(&mut self, key: &str) -> Result<bool, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Reset the TTL of a live key. Returns `false` when the key is absent.
    fn expire(&mut self, key: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    /// Prepend to a list and keep at most `capacity` newest items.
    fn push_trim(&mut self, key: &str, value: &str, capacity: usize) -> Result<(), StoreError>;

    /// List items, newest first. Empty when absent.
    fn list(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source. Local time drives the seasonal policy.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

// ───────────────────────────────────────────────────────────────
// Daylight oracle port
// ───────────────────────────────────────────────────────────────

/// Boolean "sun is shining" signal, queried once per decision cycle.
pub trait DaylightPort {
    fn sun_shining(&self, at: DateTime<Local>) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Serial link port (microcontroller ↔ handler)
// ───────────────────────────────────────────────────────────────

/// Byte-level link to the solar microcontroller.
pub trait SerialLink {
    type Error: core::fmt::Display;

    /// Read available bytes into `buf`. Returns 0 when the read timed out
    /// without data.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write the whole buffer.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Human-readable port identity, recorded under `usb.solar`.
    fn name(&self) -> &str;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
