//! Temperature channels and their plausibility envelopes.
//!
//! Every channel is a store key holding the latest accepted reading as a
//! decimal string with the telemetry TTL. The handler writes them through
//! the [`outlier`] filter; the control engine reads them back.

pub mod outlier;

use crate::app::ports::ChannelStore;
use crate::error::{SensorFault, StoreError};

/// One temperature channel: store key plus plausibility envelope (°C).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureChannel {
    pub key: &'static str,
    pub min_c: f64,
    pub max_c: f64,
    /// Largest accepted step from the previously accepted value.
    pub max_delta_c: f64,
}

const fn pipe(key: &'static str) -> TemperatureChannel {
    TemperatureChannel {
        key,
        min_c: -20.0,
        max_c: 125.0,
        max_delta_c: 5.0,
    }
}

const fn boiler(key: &'static str) -> TemperatureChannel {
    TemperatureChannel {
        key,
        min_c: 5.0,
        max_c: 105.0,
        max_delta_c: 5.0,
    }
}

pub const FLOW_IN: TemperatureChannel = pipe("pipe.TflowIn");
pub const FLOW_OUT: TemperatureChannel = pipe("pipe.TflowOut");
pub const LARGE_TOP: TemperatureChannel = boiler("boiler500.Ttop");
pub const LARGE_MIDDLE: TemperatureChannel = boiler("boiler500.Tmiddle");
pub const LARGE_BOTTOM: TemperatureChannel = boiler("boiler500.Tbottom");
pub const SMALL_TOP: TemperatureChannel = boiler("boiler200.Ttop");

/// Outdoor temperature; written by another subsystem, only read here.
pub const AUXILIARY_KEY: &str = "auxiliary.temperature";

/// Temperature fields of a telemetry record, in wire order.
pub const TELEMETRY_CHANNELS: [TemperatureChannel; 5] =
    [LARGE_TOP, LARGE_MIDDLE, LARGE_BOTTOM, FLOW_IN, FLOW_OUT];

impl TemperatureChannel {
    /// Run `candidate` through the outlier filter against `previous`.
    pub fn accept(&self, candidate: &str, previous: Option<f64>) -> bool {
        outlier::accept(candidate, previous, self.min_c, self.max_c, self.max_delta_c)
    }
}

/// Read a channel that control cannot run without.
///
/// Absent, expired and unparsable values are all sensor faults.
pub fn read_required(
    store: &impl ChannelStore,
    key: &'static str,
) -> Result<Result<f64, SensorFault>, StoreError> {
    Ok(match store.get(key)? {
        None => Err(SensorFault::MissingChannel(key)),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| SensorFault::Unparsable { key, value: raw }),
    })
}

/// Read a channel that control can do without. Unparsable reads as absent.
pub fn read_optional(store: &impl ChannelStore, key: &str) -> Result<Option<f64>, StoreError> {
    Ok(store.get(key)?.and_then(|raw| raw.trim().parse::<f64>().ok()))
}
