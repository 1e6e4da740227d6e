//! Outbound application events.
//!
//! The control engine and the serial handler emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them.

use crate::error::SensorFault;
use crate::fsm::ControlState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A decision cycle started from the persisted state.
    CycleStarted(Option<ControlState>),

    /// The commanded state was (re)entered.
    StateChanged {
        from: Option<ControlState>,
        to: ControlState,
    },

    /// Required telemetry was missing; the cycle was aborted.
    SensorFault(SensorFault),

    /// The serial handler took ownership of a port.
    LinkUp { port: String },

    /// Hardware-observed actuators disagree with the commanded state.
    Divergence {
        commanded: ControlState,
        observed: ControlState,
    },

    /// A temperature reading was rejected by the outlier filter.
    ReadingRejected { key: &'static str, raw: String },

    /// The serial handler is shutting down.
    LinkDown { reason: String },
}
