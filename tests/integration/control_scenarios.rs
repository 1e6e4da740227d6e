//! Multi-cycle scenarios for the control engine against an in-memory
//! store and a manual clock.

use chrono::TimeDelta;
use solarctl::adapters::memory_store::MemoryStore;
use solarctl::adapters::time::ManualClock;
use solarctl::app::events::AppEvent;
use solarctl::app::ports::{ChannelStore, Clock};
use solarctl::app::service::{ControlEngine, CycleOutcome};
use solarctl::config::SystemConfig;
use solarctl::fsm::ControlState;

use crate::mocks::{FixedDaylight, Recorder, local_clock};

struct Plant {
    engine: ControlEngine,
    store: MemoryStore<ManualClock>,
    clock: ManualClock,
    sink: Recorder,
    daylight: FixedDaylight,
}

impl Plant {
    fn new(clock: ManualClock) -> Self {
        Self {
            engine: ControlEngine::new(SystemConfig::default()),
            store: MemoryStore::new(clock.clone()),
            clock,
            sink: Recorder::default(),
            daylight: FixedDaylight(true),
        }
    }

    /// Publish fresh pipe readings the way the serial slave would.
    fn pipes(&mut self, flow_in: f64, flow_out: f64) {
        self.store
            .set_ex("pipe.TflowIn", &flow_in.to_string(), 60)
            .unwrap();
        self.store
            .set_ex("pipe.TflowOut", &flow_out.to_string(), 60)
            .unwrap();
    }

    /// Advance time, publish readings and run one cycle.
    fn step(&mut self, minutes: i64, flow_in: f64, flow_out: f64) -> Option<ControlState> {
        self.clock.advance(TimeDelta::minutes(minutes));
        self.pipes(flow_in, flow_out);
        self.cycle()
    }

    fn cycle(&mut self) -> Option<ControlState> {
        self.engine
            .run_cycle(&mut self.store, &self.clock, &self.daylight, &mut self.sink)
            .unwrap()
            .state()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap()
    }

    /// Pretend `state` was entered `minutes_ago` with `baseline`.
    fn seed(&mut self, state: ControlState, minutes_ago: i64, baseline: f64) {
        let stamp = self.clock.now_millis() - minutes_ago * 60_000;
        self.store.set("solar.state", state.name()).unwrap();
        self.store
            .set("solar.lastStateChange", &stamp.to_string())
            .unwrap();
        self.store
            .set("solar.stateStartTflowOut", &baseline.to_string())
            .unwrap();
    }
}

// ── Sunny summer day ──────────────────────────────────────────

#[test]
fn summer_day_walks_through_every_heating_state() {
    use ControlState::*;
    let mut p = Plant::new(local_clock(2025, 6, 15, 10));

    // Fresh install: no stamp, straight into startup.
    assert_eq!(p.step(0, 30.0, 25.0), Some(Startup));

    // The deferred stamp holds startup well past the grace period.
    assert_eq!(p.step(1, 30.0, 25.0), Some(Startup));
    assert_eq!(p.step(10, 30.0, 25.0), Some(Startup));

    // 13 minutes in: deferral plus grace have passed, collector is warm.
    assert_eq!(p.step(2, 30.0, 25.0), Some(Boiler500));
    assert_eq!(p.get("solar.stateStartTflowOut").as_deref(), Some("25"));

    // Flow-out rose more than 5 degrees: swap to the small boiler.
    assert_eq!(p.step(3, 45.0, 35.0), Some(Boiler200));

    // Strong sun keeps the small boiler until it reaches legionella temperature.
    assert_eq!(p.step(3, 45.0, 42.0), Some(Boiler200));

    // Extraction: small boiler gives up first, then the large one.
    assert_eq!(p.step(3, 30.0, 31.0), Some(Boiler500));
    assert_eq!(p.step(3, 30.0, 31.0), Some(Recycle));

    // Recycling cold water; the summer timeout is ten minutes.
    assert_eq!(p.step(3, 30.0, 30.0), Some(Recycle));
    assert_eq!(p.step(8, 15.0, 18.0), Some(RecycleTimeout));

    // Sun goes down.
    p.daylight = FixedDaylight(false);
    assert_eq!(p.step(3, 15.0, 15.0), Some(Sunset));
    assert_eq!(p.get("solar.lastStateChange"), None);

    assert_eq!(
        p.sink.transitions(),
        vec![
            Startup,
            Boiler500,
            Boiler200,
            Boiler500,
            Recycle,
            RecycleTimeout,
            Sunset
        ]
    );
}

#[test]
fn no_decision_within_grace_period() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Boiler500, 1, 20.0);
    // Would be an extraction, but only a minute has passed.
    assert_eq!(p.step(0, 30.0, 31.0), Some(ControlState::Boiler500));
    assert_eq!(p.step(1, 30.0, 31.0), Some(ControlState::Boiler500));
    assert_eq!(p.step(1, 30.0, 31.0), Some(ControlState::Recycle));
}

#[test]
fn large_boiler_kept_when_small_one_is_already_safe() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Boiler500, 5, 20.0);
    p.store.set_ex("boiler200.Ttop", "65.0", 600).unwrap();
    assert_eq!(p.step(0, 45.0, 35.0), Some(ControlState::Boiler500));
}

#[test]
fn recycle_retries_boiler500_when_loop_heats_up() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Recycle, 3, 20.0);
    assert_eq!(p.step(0, 26.0, 24.5), Some(ControlState::Boiler500));
    assert_eq!(p.get("solar.stateStartTflowOut").as_deref(), Some("24.5"));
}

#[test]
fn recycle_timeout_prefers_large_boiler_when_it_is_cold() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Recycle, 11, 30.0);
    p.store.set_ex("boiler500.Tbottom", "20.0", 600).unwrap();
    assert_eq!(p.step(0, 30.0, 30.0), Some(ControlState::Boiler500));
}

#[test]
fn first_cycle_starts_up_then_moves_to_large_boiler() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 9));
    assert_eq!(p.step(0, 25.0, 18.0), Some(ControlState::Startup));
    // The startup stamp is ten minutes ahead, then the grace period runs.
    assert_eq!(p.step(12, 25.0, 18.0), Some(ControlState::Startup));
    assert_eq!(p.step(1, 25.0, 18.0), Some(ControlState::Boiler500));
}

#[test]
fn small_boiler_kept_below_legionella_temperature() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Boiler200, 10, 45.0);
    // Delta 10.0 and flow-out under 60: keep heating boiler200 even though
    // flow-out rose well past the swap threshold.
    assert_eq!(p.step(0, 65.0, 55.0), Some(ControlState::Boiler200));
    assert_eq!(p.get("solar.stateStartTflowOut").as_deref(), Some("45"));
}

#[test]
fn recycle_retry_with_cool_inflow() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Recycle, 3, 30.0);
    assert_eq!(p.step(0, 22.0, 35.0), Some(ControlState::Boiler500));
}

// ── Winter ────────────────────────────────────────────────────

#[test]
fn winter_recycle_timeout_is_thirty_minutes() {
    let mut p = Plant::new(local_clock(2025, 12, 15, 12));
    p.seed(ControlState::Recycle, 11, 30.0);
    assert_eq!(p.step(0, 15.0, 18.0), Some(ControlState::Recycle));
    assert_eq!(p.step(20, 15.0, 18.0), Some(ControlState::RecycleTimeout));
}

#[test]
fn frosty_night_without_outdoor_sensor_does_not_defrost() {
    // The winter-night window never matches, so only the outdoor sensor
    // can trigger a defrost.
    let mut p = Plant::new(local_clock(2025, 12, 15, 3));
    p.daylight = FixedDaylight(false);
    p.store.set("solar.state", "sunset").unwrap();
    assert_eq!(p.step(0, 2.0, 1.0), Some(ControlState::Sunset));

    p.store
        .set_ex("auxiliary.temperature", "-4.0", 600)
        .unwrap();
    assert_eq!(p.step(1, 2.0, 1.0), Some(ControlState::Defrost));
    assert_eq!(p.step(1, 2.0, 1.0), Some(ControlState::Defrost));

    let defrost_entries = p
        .sink
        .transitions()
        .into_iter()
        .filter(|s| *s == ControlState::Defrost)
        .count();
    assert_eq!(defrost_entries, 1);
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn overheat_dominates_everything_and_cools_down() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 14));
    p.seed(ControlState::Boiler200, 10, 50.0);
    p.store.set_ex("boiler200.Ttop", "75.0", 6000).unwrap();

    assert_eq!(p.step(0, 98.0, 96.0), Some(ControlState::Overheat));
    // Small-boiler guard only acts on boiler200, so overheat sticks.
    assert_eq!(p.step(10, 70.0, 60.0), Some(ControlState::Overheat));
    assert_eq!(p.step(21, 70.0, 60.0), Some(ControlState::Boiler500));
}

#[test]
fn repeated_overheat_keeps_its_stamp() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 14));
    p.seed(ControlState::Boiler500, 10, 60.0);

    assert_eq!(p.step(0, 96.0, 97.0), Some(ControlState::Overheat));
    let entered = p.get("solar.lastStateChange");
    assert_eq!(entered, Some(p.clock.now_millis().to_string()));

    assert_eq!(p.step(5, 96.0, 97.0), Some(ControlState::Overheat));
    assert_eq!(p.get("solar.lastStateChange"), entered);
    assert_eq!(p.get("solar.stateStartTflowOut").as_deref(), Some("97"));
    let overheat_entries = p
        .sink
        .transitions()
        .into_iter()
        .filter(|s| *s == ControlState::Overheat)
        .count();
    assert_eq!(overheat_entries, 1);
}

#[test]
fn overheat_at_night_is_not_replaced_by_sunset() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 23));
    p.daylight = FixedDaylight(false);
    p.store.set("solar.state", "sunset").unwrap();

    assert_eq!(p.step(0, 96.0, 97.0), Some(ControlState::Overheat));
    assert_eq!(p.get("solar.state").as_deref(), Some("overheat"));
    assert_eq!(
        p.get("solar.lastStateChange"),
        Some(p.clock.now_millis().to_string())
    );

    // Still too hot: overheat holds through the night.
    assert_eq!(p.step(5, 96.0, 97.0), Some(ControlState::Overheat));
    // Cooled below the limit: night rules apply again.
    assert_eq!(p.step(5, 60.0, 70.0), Some(ControlState::Sunset));
}

#[test]
fn missing_telemetry_aborts_with_error() {
    let mut p = Plant::new(local_clock(2025, 6, 15, 12));
    p.seed(ControlState::Boiler500, 10, 40.0);
    p.pipes(40.0, 35.0);

    // Readings expire after a minute without the slave refreshing them.
    p.clock.advance(TimeDelta::seconds(61));
    let outcome = p
        .engine
        .run_cycle(&mut p.store, &p.clock, &p.daylight, &mut p.sink)
        .unwrap();
    assert!(matches!(outcome, CycleOutcome::Aborted(_)));
    assert_eq!(p.get("solar.state").as_deref(), Some("error"));
    assert!(
        p.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::SensorFault(_)))
    );

    // Telemetry back: no stamp, so startup.
    assert_eq!(p.step(0, 40.0, 35.0), Some(ControlState::Startup));
}
