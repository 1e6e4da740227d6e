//! Safety supervisor.
//!
//! Runs **every cycle before normal control** and decides which guard
//! states must be forced:
//!
//! 1. Flow-out above the pipe limit → `overheat`.
//! 2. Small boiler too hot while being heated → `boiler500`.
//! 3. Frost risk on the collector pipe → `defrost`.
//!
//! Guards are evaluated in that order against the state left by the
//! previous guard. The supervisor itself is stateless; the engine applies
//! the transitions.

use log::{info, warn};

use crate::config::SystemConfig;
use crate::fsm::ControlState;
use crate::fsm::context::Readings;

/// Safety supervisor.
pub struct SafetySupervisor {
    max_flow_out_c: f64,
    max_small_boiler_c: f64,
    defrost_aux_sum_c: f64,
    defrost_pipe_c: f64,
}

impl SafetySupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            max_flow_out_c: config.max_flow_out_c,
            max_small_boiler_c: config.max_small_boiler_c,
            defrost_aux_sum_c: config.defrost_aux_sum_c,
            defrost_pipe_c: config.defrost_pipe_c,
        }
    }

    /// Flow-out exceeds the pipe limit.
    pub fn overheat(&self, r: &Readings) -> bool {
        let hot = r.flow_out > self.max_flow_out_c;
        if hot {
            warn!(
                "Flow-out {:.1}\u{00b0}C above limit {:.1}\u{00b0}C",
                r.flow_out, self.max_flow_out_c
            );
        }
        hot
    }

    /// The small boiler is being heated beyond its user-water limit.
    pub fn small_boiler_over_limit(&self, current: Option<ControlState>, r: &Readings) -> bool {
        let over = current == Some(ControlState::Boiler200)
            && r.small_top.is_some_and(|top| top > self.max_small_boiler_c);
        if over {
            info!("Switching off small boiler to prevent overheated user water");
        }
        over
    }

    /// Frost risk on the collector pipe.
    ///
    /// With an outdoor reading the pipe and outdoor temperatures are
    /// weighed together; without one only winter nights are checked.
    pub fn defrost_indicated(&self, r: &Readings, winter_night: bool) -> bool {
        let pipe = r.pipe_min();
        match r.auxiliary {
            Some(outdoor) => pipe + outdoor < self.defrost_aux_sum_c,
            None => winter_night && pipe < self.defrost_pipe_c,
        }
    }
}
