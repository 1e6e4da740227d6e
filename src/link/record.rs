//! Record classification.
//!
//! ```text
//! log:solar:<message>                       → Record::Log
//! Ttop:Tmiddle:Tbottom:TflowIn:TflowOut:v1:v2:pump → Record::Telemetry
//! anything else                             → Record::Garbage
//! ```

use crate::error::ProtocolFault;
use crate::fsm::{ActuatorTriple, ControlState};

/// Number of `:`-separated fields in a telemetry record.
pub const TELEMETRY_FIELDS: usize = 8;

/// One telemetry record, temperatures still raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryFrame {
    /// Large top, large middle, large bottom, flow-in, flow-out.
    pub temperatures: [String; 5],
    /// Actuator positions the hardware reports.
    pub observed: ActuatorTriple,
}

impl TelemetryFrame {
    pub fn flow_out_raw(&self) -> &str {
        &self.temperatures[4]
    }

    pub fn observed_state(&self) -> ControlState {
        ControlState::decode(
            self.observed.valve_one,
            self.observed.valve_two,
            self.observed.pump,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Free-text log message from the microcontroller.
    Log(String),
    Telemetry(TelemetryFrame),
    Garbage(ProtocolFault),
}

impl Record {
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix("log:") {
            let message = rest.strip_prefix("solar:").unwrap_or(rest);
            return Self::Log(message.trim().to_string());
        }

        let fields: Vec<&str> = line.split(':').collect();
        let [t0, t1, t2, t3, t4, v1, v2, pump] = fields[..] else {
            return Self::Garbage(ProtocolFault::Garbage {
                fields: fields.len(),
                line: line.to_string(),
            });
        };
        let flag = |s: &str| s.trim() == "T";
        Self::Telemetry(TelemetryFrame {
            temperatures: [t0, t1, t2, t3, t4].map(|t| t.trim().to_string()),
            observed: ActuatorTriple::new(flag(v1), flag(v2), flag(pump)),
        })
    }
}
