//! Calendar policy: winter months and the winter-night window.
//!
//! Winter stretches the recycle timeout and, without an outdoor sensor,
//! arms the frost check.

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike};

use crate::config::SystemConfig;

/// November, December or January (`month` is 1-based).
pub fn is_winter(month: u32) -> bool {
    matches!(month, 11 | 12 | 1)
}

/// Winter night as evaluated by the installed controller.
///
/// The window is written as an intersection (`hour < 7 && hour > 21`)
/// and is therefore never true; defrost without an outdoor sensor stays
/// disabled until the installation decides otherwise.
#[allow(clippy::impossible_comparisons)]
pub fn is_winter_night(month: u32, hour: u32) -> bool {
    is_winter(month) && hour < 7 && hour > 21
}

/// How long control may stay in recycle (or recycle timeout).
pub fn recycle_timeout(winter: bool, config: &SystemConfig) -> TimeDelta {
    if winter {
        TimeDelta::try_seconds(config.recycle_timeout_winter_secs).unwrap_or(TimeDelta::MAX)
    } else {
        TimeDelta::try_seconds(config.recycle_timeout_secs).unwrap_or(TimeDelta::MAX)
    }
}

/// Calendar view of one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub winter: bool,
    pub winter_night: bool,
}

impl Season {
    pub fn at<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let month = at.month();
        Self {
            winter: is_winter(month),
            winter_night: is_winter_night(month, at.hour()),
        }
    }
}
