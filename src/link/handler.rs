//! Serial protocol handler: the hardware-facing process.
//!
//! ```text
//!  SerialLink ──▶ LineDecoder ──▶ Record ──┬─▶ log sink      (log lines)
//!       ▲                                  ├─▶ drop + error  (garbage)
//!       │                                  └─▶ outlier filter ─▶ store
//!       └──────────── command of `solar.state` ◀───────────────┘
//! ```
//!
//! Every complete record refreshes the liveness lease and feeds the
//! inactivity watchdog. A failed write or a silent link is fatal: the
//! caller releases the lease and the process exits for the supervisor to
//! restart.

use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ChannelStore, Clock, EventSink, SerialLink};
use crate::config::SystemConfig;
use crate::error::{Error, LinkFault, Result, StoreError};
use crate::fsm::ControlState;
use crate::keys;
use crate::sensors::{self, TELEMETRY_CHANNELS};

use super::codec::LineDecoder;
use super::lease::LivenessLease;
use super::record::{Record, TelemetryFrame};
use super::watchdog::LinkWatchdog;

/// Bytes requested per serial read.
const READ_CHUNK: usize = 256;

/// Log target for lines forwarded from the microcontroller.
pub const MCU_LOG_TARGET: &str = "mcu";

pub struct SerialProtocolHandler<L, S, C, E>
where
    L: SerialLink,
    S: ChannelStore,
    C: Clock,
    E: EventSink,
{
    link: L,
    store: S,
    clock: C,
    sink: E,
    config: SystemConfig,
    lease: LivenessLease,
    decoder: LineDecoder,
    watchdog: LinkWatchdog,
}

impl<L, S, C, E> SerialProtocolHandler<L, S, C, E>
where
    L: SerialLink,
    S: ChannelStore,
    C: Clock,
    E: EventSink,
{
    /// Wrap an open link. `lease` must already be acquired.
    pub fn new(link: L, store: S, clock: C, sink: E, config: SystemConfig, lease: LivenessLease) -> Self {
        let watchdog = LinkWatchdog::new(config.inactivity_timeout_secs, clock.now_millis());
        Self {
            link,
            store,
            clock,
            sink,
            config,
            lease,
            decoder: LineDecoder::new(),
            watchdog,
        }
    }

    /// Record the port in use and announce the link.
    pub fn start(&mut self) -> Result<()> {
        self.store.set(keys::PORT_NAME, self.link.name())?;
        self.watchdog.feed(self.clock.now_millis());
        self.sink.emit(&AppEvent::LinkUp {
            port: self.link.name().to_string(),
        });
        info!("Starting solar serial handler on {}", self.link.name());
        Ok(())
    }

    /// Poll until a fatal error occurs.
    pub fn run(&mut self) -> Result<()> {
        let pause = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            self.poll_once()?;
            self.check_inactivity()?;
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }
    }

    /// One read from the link; every record it completes is processed.
    /// Returns the number of records handled.
    pub fn poll_once(&mut self) -> Result<usize> {
        let mut buf = [0u8; READ_CHUNK];
        let n = self
            .link
            .read(&mut buf)
            .map_err(|e| LinkFault::ReadFailed(e.to_string()))?;
        if n == 0 {
            return Ok(0);
        }

        let lines = self.decoder.feed(&buf[..n]);
        for line in &lines {
            self.handle_line(line)?;
        }
        Ok(lines.len())
    }

    /// Fails with [`LinkFault::Inactivity`] once the link has been silent
    /// for longer than the inactivity window.
    pub fn check_inactivity(&self) -> Result<()> {
        if self.watchdog.expired(self.clock.now_millis()) {
            return Err(LinkFault::Inactivity(self.watchdog.window_secs()).into());
        }
        Ok(())
    }

    /// Process one complete record.
    pub fn handle_line(&mut self, line: &str) -> Result<()> {
        match Record::parse(line) {
            Record::Log(message) => info!(target: MCU_LOG_TARGET, "{message}"),
            Record::Garbage(fault) => error!("Received garbage from the solar controller: {fault}"),
            Record::Telemetry(frame) => {
                debug!("Solar event {line}");
                self.handle_telemetry(&frame)?;
            }
        }

        self.lease.refresh(&mut self.store)?;
        self.watchdog.feed(self.clock.now_millis());
        Ok(())
    }

    fn handle_telemetry(&mut self, frame: &TelemetryFrame) -> Result<()> {
        let ttl = self.config.telemetry_ttl_secs;

        for (channel, raw) in TELEMETRY_CHANNELS.iter().zip(&frame.temperatures) {
            let previous = sensors::read_optional(&self.store, channel.key)?;
            if channel.accept(raw, previous) {
                self.store.set_ex(channel.key, raw, ttl)?;
            } else {
                self.sink.emit(&AppEvent::ReadingRejected {
                    key: channel.key,
                    raw: raw.clone(),
                });
            }
        }

        let observed = frame.observed_state();
        self.store.set_ex(keys::OBSERVED_STATE, observed.name(), ttl)?;

        let commanded = self.commanded_state()?;
        if commanded.principal() != observed {
            self.sink.emit(&AppEvent::Divergence {
                commanded,
                observed,
            });
        }

        let hours = self.clock.now_millis() as f64 / 3_600_000.0;
        self.store.push_trim(
            keys::FLOW_HISTORY,
            &format!("{hours}:{}", frame.flow_out_raw()),
            self.config.history_capacity,
        )?;

        self.send_command(commanded)
    }

    /// Persisted commanded state; `error` when absent or unreadable.
    fn commanded_state(&self) -> Result<ControlState> {
        let raw = match self.store.get(keys::STATE) {
            Ok(raw) => raw,
            Err(StoreError::Corrupt { key, reason }) => {
                warn!("Commanded state {key} unreadable ({reason}), sending error");
                None
            }
            Err(e) => return Err(e.into()),
        };
        let Some(raw) = raw else {
            return Ok(ControlState::Error);
        };
        Ok(ControlState::parse(&raw).unwrap_or_else(|| {
            warn!("Unknown commanded state '{raw}', sending error");
            ControlState::Error
        }))
    }

    fn send_command(&mut self, state: ControlState) -> Result<()> {
        self.link
            .write_all(&state.command_bytes())
            .and_then(|()| self.link.flush())
            .map_err(|e| {
                error!("Failed writing to solar controller: {e}");
                Error::from(LinkFault::WriteFailed(e.to_string()))
            })
    }

    /// Release the lease and announce the shutdown. Errors are logged;
    /// the process is exiting anyway.
    pub fn shutdown(&mut self, reason: &Error) {
        if let Err(e) = self.lease.release(&mut self.store) {
            warn!("Could not release lease: {e}");
        }
        self.sink.emit(&AppEvent::LinkDown {
            reason: reason.to_string(),
        });
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }
}
