//! Function-pointer finite state machine for the solar circuit.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌────────────────┬──────────────────────┬─────────────────────┐ │
//! │  │ ControlState   │ EntryPolicy          │ on_update           │ │
//! │  ├────────────────┼──────────────────────┼─────────────────────┤ │
//! │  │ Sunset         │ clear · every cycle  │ heat exchange       │ │
//! │  │ Startup        │ deferred · keep      │ fn(ctx)->Option<>   │ │
//! │  │ Recycle        │ now · record         │ fn(ctx)->Option<>   │ │
//! │  │ RecycleTimeout │ now · record         │ fn(ctx)->Option<>   │ │
//! │  │ Boiler500      │ now · record         │ heat exchange       │ │
//! │  │ Boiler200      │ now · record         │ heat exchange       │ │
//! │  │ Overheat       │ now · record · idem  │ heat exchange       │ │
//! │  │ Defrost        │ now · record · idem  │ heat exchange       │ │
//! │  │ Error          │ clear · idem         │ heat exchange       │ │
//! │  └────────────────┴──────────────────────┴─────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a resident FSM the current state does not live here: it is
//! persisted in the channel store and reloaded every decision cycle. The
//! engine asks [`Fsm::update`] for the normal-control verdict and applies
//! the target's [`EntryPolicy`] when it transitions.

pub mod context;
pub mod states;

use core::fmt;

use context::ControlContext;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every commanded mode of the solar circuit.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlState {
    Sunset = 0,
    Startup = 1,
    Recycle = 2,
    RecycleTimeout = 3,
    Boiler500 = 4,
    Boiler200 = 5,
    Overheat = 6,
    Defrost = 7,
    Error = 8,
}

/// Positions of the two diverter valves and the circulation pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorTriple {
    pub valve_one: bool,
    pub valve_two: bool,
    pub pump: bool,
}

impl ActuatorTriple {
    pub const fn new(valve_one: bool, valve_two: bool, pump: bool) -> Self {
        Self {
            valve_one,
            valve_two,
            pump,
        }
    }

    /// Three ASCII bytes, `'T'` or `'F'` each, in wire order.
    pub fn to_bytes(self) -> [u8; 3] {
        let b = |on: bool| if on { b'T' } else { b'F' };
        [b(self.valve_one), b(self.valve_two), b(self.pump)]
    }
}

impl ControlState {
    /// Total number of states, sizes the table array.
    pub const COUNT: usize = 9;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Sunset,
        Self::Startup,
        Self::Recycle,
        Self::RecycleTimeout,
        Self::Boiler500,
        Self::Boiler200,
        Self::Overheat,
        Self::Defrost,
        Self::Error,
    ];

    /// Convert a table index back to `ControlState`.  Panics on
    /// out-of-range in debug builds; returns `Error` in release.
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(state) => *state,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }

    /// Name as persisted under `solar.state`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sunset => "sunset",
            Self::Startup => "startup",
            Self::Recycle => "recycle",
            Self::RecycleTimeout => "recycleTimeout",
            Self::Boiler500 => "boiler500",
            Self::Boiler200 => "boiler200",
            Self::Overheat => "overheat",
            Self::Defrost => "defrost",
            Self::Error => "error",
        }
    }

    /// Inverse of [`name`](Self::name). Case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.name() == s)
    }

    /// Fixed actuator positions for this state.
    pub fn triple(self) -> ActuatorTriple {
        match self {
            Self::Startup | Self::Recycle => ActuatorTriple::new(true, true, true),
            Self::RecycleTimeout => ActuatorTriple::new(true, true, false),
            Self::Boiler500 | Self::Defrost => ActuatorTriple::new(false, false, true),
            Self::Boiler200 => ActuatorTriple::new(true, false, true),
            Self::Sunset | Self::Overheat | Self::Error => {
                ActuatorTriple::new(false, false, false)
            }
        }
    }

    /// Serial response commanding this state.
    pub fn command_bytes(self) -> [u8; 3] {
        self.triple().to_bytes()
    }

    /// Lossy decode of observed actuator positions into the principal
    /// state they resemble.
    pub fn decode(valve_one: bool, valve_two: bool, pump: bool) -> Self {
        match (valve_one, valve_two, pump) {
            (false, false, false) => Self::Sunset,
            (false, false, _) => Self::Boiler500,
            (_, false, _) => Self::Boiler200,
            _ => Self::Recycle,
        }
    }

    /// What the hardware would report back while in this state.
    pub fn principal(self) -> Self {
        let t = self.triple();
        Self::decode(t.valve_one, t.valve_two, t.pump)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Entry policy: bookkeeping written when a state is entered
// ---------------------------------------------------------------------------

/// What happens to `solar.lastStateChange` on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampPolicy {
    /// Transition instant.
    Now,
    /// Transition instant plus the start-up deferral.
    Deferred,
    /// Deleted; the next normal-control cycle re-enters startup.
    Clear,
}

/// What happens to `solar.stateStartTflowOut` on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselinePolicy {
    Record,
    Keep,
    Clear,
}

/// When the flow-out history list is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryReset {
    OnEntry,
    /// On every request for this state, even when already in it.
    EveryCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPolicy {
    pub stamp: StampPolicy,
    pub baseline: BaselinePolicy,
    /// Skip all writes when the state is already current.
    pub only_if_changed: bool,
    pub history: HistoryReset,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Normal-control handler for one state, run once the grace period has
/// passed. Returns `Some(next)` to request a transition.
pub type StateUpdateFn = fn(&ControlContext<'_>) -> Option<ControlState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: ControlState,
    pub name: &'static str,
    pub entry: EntryPolicy,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// Immutable table of state descriptors plus the normal-control entry point.
pub struct Fsm {
    /// Fixed-size table indexed by `ControlState as usize`.
    table: [StateDescriptor; ControlState::COUNT],
}

impl Fsm {
    pub fn new(table: [StateDescriptor; ControlState::COUNT]) -> Self {
        Self { table }
    }

    pub fn descriptor(&self, state: ControlState) -> &StateDescriptor {
        &self.table[state as usize]
    }

    pub fn entry_policy(&self, state: ControlState) -> EntryPolicy {
        self.descriptor(state).entry
    }

    /// Normal-control verdict for the context's current state.
    ///
    /// An absent state-change stamp always yields `Startup`. No handler
    /// runs until the elapsed time strictly exceeds the grace period.
    pub fn update(&self, ctx: &ControlContext<'_>) -> Option<ControlState> {
        let Some(elapsed) = ctx.elapsed else {
            return Some(ControlState::Startup);
        };
        if elapsed <= ctx.grace_period() {
            return None;
        }
        match ctx.current {
            Some(state) => (self.descriptor(state).on_update)(ctx),
            None => states::heat_exchange_update(ctx),
        }
    }
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new(states::build_state_table())
    }
}
