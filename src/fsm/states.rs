//! Concrete normal-control handlers and table builder.
//!
//! Each state is one descriptor row: an entry policy and a plain `fn`
//! pointer for normal control. Safety overrides, defrost, sunset and the
//! overheat cooldown are decided by the engine before these run.
//!
//! ```text
//!  STARTUP ──[flow-in warm]──▶ BOILER500 ◀──[swap]──▶ BOILER200
//!     │                          │   ▲                    │
//!  [cold]                 [extracting] [heating again]  [extracting]
//!     ▼                          ▼   │                    │
//!  RECYCLE_TIMEOUT ◀─[timeout]─ RECYCLE ◀─────────────────┘ (via BOILER500)
//!     │                          ▲
//!     └────────[timeout]─────────┘
//! ```

use super::context::ControlContext;
use super::{
    BaselinePolicy, ControlState, EntryPolicy, HistoryReset, StampPolicy, StateDescriptor,
};
use log::{debug, error};

// ═══════════════════════════════════════════════════════════════════════════
//  Entry policies
// ═══════════════════════════════════════════════════════════════════════════

const DEFERRED_ENTRY: EntryPolicy = EntryPolicy {
    stamp: StampPolicy::Deferred,
    baseline: BaselinePolicy::Keep,
    only_if_changed: false,
    history: HistoryReset::OnEntry,
};

const CONTROL_ENTRY: EntryPolicy = EntryPolicy {
    stamp: StampPolicy::Now,
    baseline: BaselinePolicy::Record,
    only_if_changed: false,
    history: HistoryReset::OnEntry,
};

const GUARD_ENTRY: EntryPolicy = EntryPolicy {
    stamp: StampPolicy::Now,
    baseline: BaselinePolicy::Record,
    only_if_changed: true,
    history: HistoryReset::OnEntry,
};

const FAULT_ENTRY: EntryPolicy = EntryPolicy {
    stamp: StampPolicy::Clear,
    baseline: BaselinePolicy::Clear,
    only_if_changed: true,
    history: HistoryReset::OnEntry,
};

const SUNSET_ENTRY: EntryPolicy = EntryPolicy {
    stamp: StampPolicy::Clear,
    baseline: BaselinePolicy::Clear,
    only_if_changed: true,
    history: HistoryReset::EveryCycle,
};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

fn row(id: ControlState, entry: EntryPolicy, on_update: super::StateUpdateFn) -> StateDescriptor {
    StateDescriptor {
        id,
        name: id.name(),
        entry,
        on_update,
    }
}

/// Build the static state table.  Row order follows `ControlState as usize`.
pub fn build_state_table() -> [StateDescriptor; ControlState::COUNT] {
    [
        row(ControlState::Sunset, SUNSET_ENTRY, heat_exchange_update),
        row(ControlState::Startup, DEFERRED_ENTRY, startup_update),
        row(ControlState::Recycle, CONTROL_ENTRY, recycle_update),
        row(ControlState::RecycleTimeout, CONTROL_ENTRY, recycle_timeout_update),
        row(ControlState::Boiler500, CONTROL_ENTRY, heat_exchange_update),
        row(ControlState::Boiler200, CONTROL_ENTRY, heat_exchange_update),
        row(ControlState::Overheat, GUARD_ENTRY, heat_exchange_update),
        row(ControlState::Defrost, GUARD_ENTRY, heat_exchange_update),
        row(ControlState::Error, FAULT_ENTRY, heat_exchange_update),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  STARTUP
// ═══════════════════════════════════════════════════════════════════════════

fn startup_update(ctx: &ControlContext<'_>) -> Option<ControlState> {
    if ctx.readings.flow_in > ctx.config.min_solar_pipe_c {
        Some(ControlState::Boiler500)
    } else {
        Some(ControlState::RecycleTimeout)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RECYCLE
// ═══════════════════════════════════════════════════════════════════════════

fn recycle_update(ctx: &ControlContext<'_>) -> Option<ControlState> {
    let r = &ctx.readings;
    let c = ctx.config;

    if r.flow_out > ctx.baseline + c.recycle_retry_rise_c && r.flow_in > c.min_solar_pipe_c {
        debug!("Recycle loop is heating up, retrying boiler500");
        return Some(ControlState::Boiler500);
    }

    if ctx.elapsed_exceeds(ctx.recycle_timeout()) && r.flow_out < c.recycle_max_c {
        return match r.large_bottom {
            Some(bottom) if r.flow_in > bottom + c.boiler_control_offset_c => {
                Some(ControlState::Boiler500)
            }
            _ => Some(ControlState::RecycleTimeout),
        };
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RECYCLE TIMEOUT
// ═══════════════════════════════════════════════════════════════════════════

fn recycle_timeout_update(ctx: &ControlContext<'_>) -> Option<ControlState> {
    ctx.elapsed_exceeds(ctx.recycle_timeout())
        .then_some(ControlState::Recycle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEAT EXCHANGE (boiler500, boiler200 and every state without its own rule)
// ═══════════════════════════════════════════════════════════════════════════

/// Shared rule for states that route flow through a boiler.
pub(super) fn heat_exchange_update(ctx: &ControlContext<'_>) -> Option<ControlState> {
    let r = &ctx.readings;
    let c = ctx.config;
    let delta = r.flow_in - r.flow_out;

    if r.flow_in > r.flow_out + c.min_flow_delta_c {
        // Heat is being delivered to the current boiler.
        let strong_sun = r.flow_out < c.legionella_c && delta > c.large_flow_delta_c;
        match ctx.current {
            Some(ControlState::Boiler200) if strong_sun => {
                debug!("Keeping boiler200 to get it above legionella temperature");
                None
            }
            Some(ControlState::Boiler500)
                if strong_sun && r.small_top.is_some_and(|top| top > c.legionella_c) =>
            {
                debug!("Keeping boiler500, boiler200 is already above legionella temperature");
                None
            }
            current if r.flow_out > ctx.baseline + c.swap_boiler_rise_c => {
                if current == Some(ControlState::Boiler200) {
                    Some(ControlState::Boiler500)
                } else {
                    Some(ControlState::Boiler200)
                }
            }
            _ => None,
        }
    } else {
        // Heat is being extracted from the current boiler.
        match ctx.current {
            Some(ControlState::Boiler200) => Some(ControlState::Boiler500),
            Some(ControlState::Boiler500) => Some(ControlState::Recycle),
            other => {
                error!(
                    "Unexpected solar state {}, going into recycle",
                    other.map_or("<none>", ControlState::name)
                );
                Some(ControlState::Recycle)
            }
        }
    }
}
