//! Hardware-facing side: serial framing, record classification, the
//! protocol handler and its liveness guards.

pub mod codec;
pub mod handler;
pub mod lease;
pub mod record;
pub mod watchdog;

pub use codec::LineDecoder;
pub use handler::SerialProtocolHandler;
pub use lease::LivenessLease;
pub use record::{Record, TelemetryFrame};
