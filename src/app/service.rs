//! Control engine: the decision-side hexagonal core.
//!
//! [`ControlEngine`] owns the state table and the safety supervisor. Each
//! call to [`run_cycle`](ControlEngine::run_cycle) reloads the persisted
//! state from the store, evaluates guards and normal control, and writes
//! the outcome back. All I/O flows through port traits injected at call
//! sites, so a cycle is fully testable with in-memory adapters.
//!
//! ```text
//!  ChannelStore ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!  Clock        ──▶ │       ControlEngine        │
//!  DaylightPort ──▶ │  Safety · Dispatch · FSM   │ ──▶ ChannelStore
//!                   └────────────────────────────┘
//! ```
//!
//! Cycle order:
//! 1. read inputs (missing flow channels → `error`, cycle aborted)
//! 2. overheat guard
//! 3. small-boiler guard
//! 4. defrost guard
//! 5. dispatch: defrost exit · sunset · overheat cooldown · normal control
//!
//! The in-memory current state follows every transition made earlier in
//! the same cycle. A flow-out above the overheat limit holds off sunset, so
//! an overheat forced at night survives the cycle that forced it.

use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::{Result, SensorFault, StoreError};
use crate::fsm::context::{ControlContext, Readings};
use crate::fsm::{BaselinePolicy, ControlState, Fsm, HistoryReset, StampPolicy};
use crate::keys;
use crate::safety::SafetySupervisor;
use crate::season::Season;
use crate::sensors::{self, AUXILIARY_KEY, FLOW_IN, FLOW_OUT, LARGE_BOTTOM, SMALL_TOP};

use super::events::AppEvent;
use super::ports::{ChannelStore, Clock, DaylightPort, EventSink};

// ───────────────────────────────────────────────────────────────
// Cycle outcome
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The cycle ran to completion.
    Completed {
        from: Option<ControlState>,
        to: Option<ControlState>,
    },
    /// Required telemetry was missing; `error` was commanded.
    Aborted(SensorFault),
}

impl CycleOutcome {
    /// Commanded state at the end of the cycle.
    pub fn state(&self) -> Option<ControlState> {
        match self {
            Self::Completed { to, .. } => *to,
            Self::Aborted(_) => Some(ControlState::Error),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ControlEngine
// ───────────────────────────────────────────────────────────────

pub struct ControlEngine {
    fsm: Fsm,
    safety: SafetySupervisor,
    config: SystemConfig,
}

/// Mutable view of one cycle in progress.
struct Cycle<'p, S: ChannelStore, E: EventSink> {
    store: &'p mut S,
    sink: &'p mut E,
    now: DateTime<Local>,
    current: Option<ControlState>,
}

impl ControlEngine {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            fsm: Fsm::default(),
            safety: SafetySupervisor::new(&config),
            config,
        }
    }

    /// Run one decision cycle.
    ///
    /// Store errors propagate; a sensor fault commands `error` and is
    /// reported as [`CycleOutcome::Aborted`].
    pub fn run_cycle(
        &self,
        store: &mut impl ChannelStore,
        clock: &impl Clock,
        daylight: &impl DaylightPort,
        sink: &mut impl EventSink,
    ) -> Result<CycleOutcome> {
        let now = clock.now();
        let current = load_state(store)?;
        sink.emit(&AppEvent::CycleStarted(current));

        let mut cycle = Cycle {
            store,
            sink,
            now,
            current,
        };
        let from = cycle.current;

        // 1. Inputs
        let readings = match read_inputs(&*cycle.store)? {
            Ok(r) => r,
            Err(fault) => {
                cycle.sink.emit(&AppEvent::SensorFault(fault.clone()));
                self.enter(&mut cycle, ControlState::Error, None)?;
                return Ok(CycleOutcome::Aborted(fault));
            }
        };
        let baseline = sensors::read_optional(&*cycle.store, keys::STATE_START_FLOW_OUT)?.unwrap_or(0.0);
        let flow_out = Some(readings.flow_out);

        // 2. Overheat guard
        let overheated = self.safety.overheat(&readings);
        if overheated {
            self.enter(&mut cycle, ControlState::Overheat, flow_out)?;
        }

        // 3. Small-boiler guard
        if self.safety.small_boiler_over_limit(cycle.current, &readings) {
            self.enter(&mut cycle, ControlState::Boiler500, flow_out)?;
        }

        // 4. Defrost guard
        let season = Season::at(&now);
        let frost = self.safety.defrost_indicated(&readings, season.winter_night);
        if frost {
            self.enter(&mut cycle, ControlState::Defrost, flow_out)?;
        }

        // 5. Dispatch
        if cycle.current == Some(ControlState::Defrost) {
            if !frost {
                info!("Ending defrost status, switching to startup");
                self.enter(&mut cycle, ControlState::Startup, flow_out)?;
            }
        } else if !overheated && !daylight.sun_shining(now) {
            self.enter(&mut cycle, ControlState::Sunset, flow_out)?;
        } else if cycle.current == Some(ControlState::Overheat) {
            let cooled = match elapsed_since_change(&*cycle.store, now)? {
                Some(elapsed) => {
                    let cooldown = TimeDelta::try_seconds(self.config.overheat_cooldown_secs);
                    elapsed > cooldown.unwrap_or(TimeDelta::MAX)
                }
                None => true,
            };
            if cooled {
                info!("Ending overheat status, switching to boiler500");
                self.enter(&mut cycle, ControlState::Boiler500, flow_out)?;
            }
        } else {
            let ctx = ControlContext {
                current: cycle.current,
                readings,
                baseline,
                elapsed: elapsed_since_change(&*cycle.store, now)?,
                winter: season.winter,
                config: &self.config,
            };
            if let Some(next) = self.fsm.update(&ctx) {
                self.enter(&mut cycle, next, flow_out)?;
            }
        }

        Ok(CycleOutcome::Completed {
            from,
            to: cycle.current,
        })
    }

    /// Command `target` and write its bookkeeping.
    fn enter<S: ChannelStore, E: EventSink>(
        &self,
        cycle: &mut Cycle<'_, S, E>,
        target: ControlState,
        flow_out: Option<f64>,
    ) -> Result<()> {
        let policy = self.fsm.entry_policy(target);

        if policy.history == HistoryReset::EveryCycle {
            cycle.store.delete(keys::FLOW_HISTORY)?;
        }
        if policy.only_if_changed && cycle.current == Some(target) {
            return Ok(());
        }

        cycle.store.set(keys::STATE, target.name())?;

        let now_ms = cycle.now.timestamp_millis();
        match policy.stamp {
            StampPolicy::Now => cycle.store.set(keys::LAST_STATE_CHANGE, &now_ms.to_string())?,
            StampPolicy::Deferred => {
                let at = now_ms.saturating_add(self.config.startup_deferral_secs.saturating_mul(1000));
                cycle.store.set(keys::LAST_STATE_CHANGE, &at.to_string())?;
            }
            StampPolicy::Clear => {
                cycle.store.delete(keys::LAST_STATE_CHANGE)?;
            }
        }

        match (policy.baseline, flow_out) {
            (BaselinePolicy::Record, Some(v)) => {
                cycle.store.set(keys::STATE_START_FLOW_OUT, &v.to_string())?;
            }
            (BaselinePolicy::Clear, _) => {
                cycle.store.delete(keys::STATE_START_FLOW_OUT)?;
            }
            (BaselinePolicy::Record | BaselinePolicy::Keep, _) => {}
        }

        if policy.history == HistoryReset::OnEntry {
            cycle.store.delete(keys::FLOW_HISTORY)?;
        }

        info!("Going into {target} state");
        cycle.sink.emit(&AppEvent::StateChanged {
            from: cycle.current,
            to: target,
        });
        cycle.current = Some(target);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Store reads
// ───────────────────────────────────────────────────────────────

/// Persisted commanded state; unknown names read as absent.
fn load_state(store: &impl ChannelStore) -> Result<Option<ControlState>> {
    Ok(store.get(keys::STATE)?.and_then(|raw| {
        let state = ControlState::parse(&raw);
        if state.is_none() {
            warn!("Ignoring unknown persisted state '{raw}'");
        }
        state
    }))
}

fn read_inputs(store: &impl ChannelStore) -> core::result::Result<core::result::Result<Readings, SensorFault>, StoreError> {
    let flow_in = match sensors::read_required(store, FLOW_IN.key)? {
        Ok(v) => v,
        Err(fault) => return Ok(Err(fault)),
    };
    let flow_out = match sensors::read_required(store, FLOW_OUT.key)? {
        Ok(v) => v,
        Err(fault) => return Ok(Err(fault)),
    };

    let optional = |key: &str| -> core::result::Result<Option<f64>, StoreError> {
        let value = sensors::read_optional(store, key)?;
        if value.is_none() {
            warn!("Temperature {key} not available");
        }
        Ok(value)
    };

    Ok(Ok(Readings {
        flow_in,
        flow_out,
        large_bottom: optional(LARGE_BOTTOM.key)?,
        small_top: optional(SMALL_TOP.key)?,
        auxiliary: optional(AUXILIARY_KEY)?,
    }))
}

/// Time since `solar.lastStateChange`; `None` when absent or unreadable.
fn elapsed_since_change(
    store: &impl ChannelStore,
    now: DateTime<Local>,
) -> core::result::Result<Option<TimeDelta>, StoreError> {
    let Some(raw) = store.get(keys::LAST_STATE_CHANGE)? else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(stamp) => Ok(Some(TimeDelta::milliseconds(now.timestamp_millis() - stamp))),
        Err(_) => {
            debug!("Unreadable state change stamp '{raw}'");
            Ok(None)
        }
    }
}
