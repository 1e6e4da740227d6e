//! Serial protocol handler against a scripted link.

use chrono::TimeDelta;
use solarctl::adapters::memory_store::MemoryStore;
use solarctl::adapters::time::ManualClock;
use solarctl::app::events::AppEvent;
use solarctl::app::ports::ChannelStore;
use solarctl::config::{LeaseAcquire, SystemConfig};
use solarctl::error::{Error, LinkFault};
use solarctl::fsm::ControlState;
use solarctl::link::{LivenessLease, SerialProtocolHandler};

use crate::mocks::{Recorder, ScriptedLink};

type Handler = SerialProtocolHandler<ScriptedLink, MemoryStore<ManualClock>, ManualClock, Recorder>;

const LEASE_KEY: &str = "solarslave.starttime.solar";

fn handler_with(link: ScriptedLink, clock: ManualClock, prepare: impl FnOnce(&mut MemoryStore<ManualClock>)) -> Handler {
    let mut store = MemoryStore::new(clock.clone());
    prepare(&mut store);
    let lease = LivenessLease::new("solar", 60, LeaseAcquire::Atomic);
    lease.acquire(&mut store).unwrap();
    let config = SystemConfig {
        poll_interval_ms: 0,
        ..SystemConfig::default()
    };
    let mut handler = SerialProtocolHandler::new(link, store, clock, Recorder::default(), config, lease);
    handler.start().unwrap();
    handler
}

fn handler(link: ScriptedLink) -> Handler {
    handler_with(link, ManualClock::at_millis(7_200_000), |_| {})
}

fn poll_all(h: &mut Handler) -> usize {
    let mut total = 0;
    while !h.link().incoming.is_empty() {
        total += h.poll_once().unwrap();
    }
    total
}

#[test]
fn start_records_port_name() {
    let h = handler(ScriptedLink::new());
    assert_eq!(
        h.store().get("usb.solar").unwrap().as_deref(),
        Some("/dev/ttyMOCK0")
    );
    assert!(matches!(h.sink().events[0], AppEvent::LinkUp { .. }));
}

#[test]
fn telemetry_is_published_and_answered() {
    let mut link = ScriptedLink::new();
    link.queue(b"55.0:50.0:45.0:30.0:25.0:F:F:T\r\n");
    let mut h = handler(link);
    assert_eq!(poll_all(&mut h), 1);

    let store = h.store();
    for (key, value) in [
        ("boiler500.Ttop", "55.0"),
        ("boiler500.Tmiddle", "50.0"),
        ("boiler500.Tbottom", "45.0"),
        ("pipe.TflowIn", "30.0"),
        ("pipe.TflowOut", "25.0"),
        ("solarStateReal", "boiler500"),
    ] {
        assert_eq!(store.get(key).unwrap().as_deref(), Some(value), "{key}");
    }
    assert_eq!(store.list("pipe.TflowSet").unwrap(), vec!["2:25.0"]);

    // Nothing commanded yet: the controller is told to shut down.
    assert_eq!(h.link().written, vec![b"FFF".to_vec()]);
}

#[test]
fn commanded_state_is_sent_back() {
    let mut link = ScriptedLink::new();
    link.queue(b"55.0:50.0:45.0:30.0:25.0:T:F:T\n");
    let mut h = handler_with(link, ManualClock::at_millis(0), |s| {
        s.set("solar.state", "boiler200").unwrap();
    });
    poll_all(&mut h);
    assert_eq!(h.link().written, vec![b"TFT".to_vec()]);
    assert_eq!(h.link().commands(), vec![ControlState::Boiler200]);
    assert!(
        !h.sink()
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::Divergence { .. }))
    );
}

#[test]
fn divergence_is_reported() {
    let mut link = ScriptedLink::new();
    link.queue(b"55.0:50.0:45.0:30.0:25.0:F:F:F\n");
    let mut h = handler_with(link, ManualClock::at_millis(0), |s| {
        s.set("solar.state", "recycleTimeout").unwrap();
    });
    poll_all(&mut h);
    assert!(h.sink().events.contains(&AppEvent::Divergence {
        commanded: ControlState::RecycleTimeout,
        observed: ControlState::Sunset,
    }));
    assert_eq!(h.link().written, vec![b"TTF".to_vec()]);
}

#[test]
fn unknown_commanded_state_sends_error() {
    let mut link = ScriptedLink::new();
    link.queue(b"55.0:50.0:45.0:30.0:25.0:F:F:F\n");
    let mut h = handler_with(link, ManualClock::at_millis(0), |s| {
        s.set("solar.state", "solarState").unwrap();
    });
    poll_all(&mut h);
    assert_eq!(h.link().written, vec![ControlState::Error.command_bytes().to_vec()]);
}

#[test]
fn log_and_garbage_lines_get_no_response() {
    let mut link = ScriptedLink::new();
    link.queue(b"log:solar:valve one stuck\n");
    link.queue(b"1:2:3\n");
    link.queue(b"\r\n");
    let mut h = handler(link);
    assert_eq!(poll_all(&mut h), 2);
    assert!(h.link().written.is_empty());
    assert!(h.store().get("pipe.TflowIn").unwrap().is_none());
}

#[test]
fn record_split_across_reads_is_reassembled() {
    let mut link = ScriptedLink::new();
    link.queue(b"55.0:50.0:4");
    link.queue(b"5.0:30.0:25");
    link.queue(b".0:F:F:T\r");
    link.queue(b"\n");
    let mut h = handler(link);
    assert_eq!(poll_all(&mut h), 1);
    assert_eq!(h.link().written.len(), 1);
}

#[test]
fn outlier_is_rejected_and_previous_value_kept() {
    let mut link = ScriptedLink::new();
    link.queue(b"55.0:50.0:45.0:30.0:25.0:F:F:T\n");
    link.queue(b"55.0:50.0:45.0:80.0:25.0:F:F:T\n");
    let mut h = handler(link);
    poll_all(&mut h);

    assert_eq!(h.store().get("pipe.TflowIn").unwrap().as_deref(), Some("30.0"));
    assert!(h.sink().events.contains(&AppEvent::ReadingRejected {
        key: "pipe.TflowIn",
        raw: "80.0".to_string(),
    }));
    // Rejection does not suppress the response.
    assert_eq!(h.link().written.len(), 2);
    // History keeps the raw flow-out of every record, newest first.
    assert_eq!(h.store().list("pipe.TflowSet").unwrap().len(), 2);
}

#[test]
fn records_refresh_the_lease() {
    let clock = ManualClock::at_millis(0);
    let mut link = ScriptedLink::with_clock(clock.clone(), TimeDelta::seconds(45));
    link.queue(b"log:solar:tick\n");
    link.queue(b"log:solar:tick\n");
    link.queue(b"log:solar:tick\n");
    let mut h = handler_with(link, clock, |_| {});
    poll_all(&mut h);
    // 135 s after acquisition, alive only because each record refreshed it.
    assert!(h.store().exists(LEASE_KEY).unwrap());
}

#[test]
fn silent_link_trips_inactivity() {
    let clock = ManualClock::at_millis(0);
    let link = ScriptedLink::with_clock(clock.clone(), TimeDelta::seconds(1));
    let mut h = handler_with(link, clock, |_| {});
    let err = h.run().unwrap_err();
    assert!(matches!(err, Error::Link(LinkFault::Inactivity(60))));
    assert!(err.is_supervised_exit());

    h.shutdown(&err);
    assert!(!h.store().exists(LEASE_KEY).unwrap());
    assert!(matches!(
        h.sink().events.last(),
        Some(AppEvent::LinkDown { .. })
    ));
}

#[test]
fn write_failure_is_fatal() {
    let mut link = ScriptedLink::new();
    link.fail_writes = true;
    link.queue(b"55.0:50.0:45.0:30.0:25.0:F:F:T\n");
    let mut h = handler(link);
    let err = h.poll_once().unwrap_err();
    assert!(matches!(err, Error::Link(LinkFault::WriteFailed(_))));
    assert!(err.is_supervised_exit());
}
