//! Read-only context handed to every normal-control handler.
//!
//! `ControlContext` is assembled fresh each decision cycle from the channel
//! store: the current commanded state, the temperature snapshot, the
//! flow-out baseline recorded at state entry and the time since the last
//! state change.

use chrono::TimeDelta;

use crate::config::SystemConfig;
use crate::season;

use super::ControlState;

// ---------------------------------------------------------------------------
// Temperature snapshot
// ---------------------------------------------------------------------------

/// Temperatures read from the store at the start of a cycle (°C).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    /// Collector return into the cellar.
    pub flow_in: f64,
    /// Flow back to the collectors.
    pub flow_out: f64,
    /// Large boiler, bottom sensor.
    pub large_bottom: Option<f64>,
    /// Small boiler, top sensor.
    pub small_top: Option<f64>,
    /// Outdoor temperature from the auxiliary sensor.
    pub auxiliary: Option<f64>,
}

impl Readings {
    /// Coldest point of the solar pipe.
    pub fn pipe_min(&self) -> f64 {
        self.flow_in.min(self.flow_out)
    }
}

// ---------------------------------------------------------------------------
// ControlContext
// ---------------------------------------------------------------------------

pub struct ControlContext<'a> {
    /// `None` when no state has been persisted yet.
    pub current: Option<ControlState>,
    pub readings: Readings,
    /// Flow-out at entry into the current state; 0.0 when absent.
    pub baseline: f64,
    /// Time since `solar.lastStateChange`. Negative while a deferred
    /// startup stamp lies in the future; `None` when the stamp is absent.
    pub elapsed: Option<TimeDelta>,
    /// Calendar month is one of November, December, January.
    pub winter: bool,
    pub config: &'a SystemConfig,
}

impl ControlContext<'_> {
    pub fn grace_period(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.config.grace_period_secs).unwrap_or(TimeDelta::MAX)
    }

    pub fn recycle_timeout(&self) -> TimeDelta {
        season::recycle_timeout(self.winter, self.config)
    }

    /// Strictly more than `limit` has elapsed since the last state change.
    pub fn elapsed_exceeds(&self, limit: TimeDelta) -> bool {
        self.elapsed.is_some_and(|e| e > limit)
    }
}
