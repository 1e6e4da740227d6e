//! Mock adapters for integration tests.
//!
//! The scripted link replays canned byte chunks and records every write so
//! tests can assert on the full command history without a real port.

use std::collections::VecDeque;
use std::io;

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone};
use solarctl::adapters::time::ManualClock;
use solarctl::app::events::AppEvent;
use solarctl::app::ports::{DaylightPort, EventSink, SerialLink};
use solarctl::fsm::ControlState;

// ── ScriptedLink ──────────────────────────────────────────────

pub struct ScriptedLink {
    pub incoming: VecDeque<Vec<u8>>,
    pub written: Vec<Vec<u8>>,
    pub fail_writes: bool,
    /// Advanced by `per_read` on every read, data or not.
    pub clock: Option<(ManualClock, TimeDelta)>,
}

#[allow(dead_code)]
impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            incoming: VecDeque::new(),
            written: Vec::new(),
            fail_writes: false,
            clock: None,
        }
    }

    pub fn with_clock(clock: ManualClock, per_read: TimeDelta) -> Self {
        Self {
            clock: Some((clock, per_read)),
            ..Self::new()
        }
    }

    pub fn queue(&mut self, bytes: &[u8]) {
        self.incoming.push_back(bytes.to_vec());
    }

    /// Commanded states decoded from the written responses.
    pub fn commands(&self) -> Vec<ControlState> {
        self.written
            .iter()
            .filter(|w| w.len() == 3)
            .map(|w| ControlState::decode(w[0] == b'T', w[1] == b'T', w[2] == b'T'))
            .collect()
    }
}

impl SerialLink for ScriptedLink {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        if let Some((clock, step)) = &self.clock {
            clock.advance(*step);
        }
        match self.incoming.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.incoming.push_front(chunk[n..].to_vec());
                }
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        self.written.push(data.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }

    fn name(&self) -> &str {
        "/dev/ttyMOCK0"
    }
}

// ── Recorder ──────────────────────────────────────────────────

#[derive(Default)]
pub struct Recorder {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn transitions(&self) -> Vec<ControlState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for Recorder {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── FixedDaylight ─────────────────────────────────────────────

pub struct FixedDaylight(pub bool);

impl DaylightPort for FixedDaylight {
    fn sun_shining(&self, _at: DateTime<Local>) -> bool {
        self.0
    }
}

/// Local wall-clock instant as a manual clock.
#[allow(dead_code)]
pub fn local_clock(year: i32, month: u32, day: u32, hour: u32) -> ManualClock {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date");
    let at = Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("representable local time");
    ManualClock::at(&at)
}
