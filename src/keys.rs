//! Store keys shared by the serial handler, the control engine and
//! monitoring consumers. Temperature channel keys live in
//! [`sensors`](crate::sensors).

/// Commanded control state, no TTL.
pub const STATE: &str = "solar.state";
/// Epoch milliseconds of the last transition, no TTL.
pub const LAST_STATE_CHANGE: &str = "solar.lastStateChange";
/// Flow-out at entry into the current state, no TTL.
pub const STATE_START_FLOW_OUT: &str = "solar.stateStartTflowOut";
/// State decoded from the actuator positions the hardware reports.
pub const OBSERVED_STATE: &str = "solarStateReal";
/// Bounded list of `hours:flowOut` samples, newest first.
pub const FLOW_HISTORY: &str = "pipe.TflowSet";
/// Serial port the handler opened, no TTL.
pub const PORT_NAME: &str = "usb.solar";

/// Liveness lease of the handler owning `device`.
pub fn lease(device: &str) -> String {
    format!("solarslave.starttime.{device}")
}
