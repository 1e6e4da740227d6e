//! solarctl entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SerialPortLink   FileStore      SystemClock   LogEventSink  │
//! │  (SerialLink)     (ChannelStore) (Clock)       (EventSink)   │
//! │  SunPositionDaylight (DaylightPort)                          │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌──────────────────────┐      ┌──────────────────────────┐  │
//! │  │ SerialProtocolHandler│      │      ControlEngine       │  │
//! │  │ codec · lease · dog  │      │  Safety · Dispatch · FSM │  │
//! │  └──────────────────────┘      └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subcommands:
//!
//! - `slave [--port PATH]`: serial handler; exits 0 on link loss, lease
//!   conflict or missing device so the supervisor restarts it.
//! - `control [--loop]`: one decision cycle, or one per interval.
//! - `ports`: list serial ports.
//!
//! `--config PATH` is accepted before or after the subcommand.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use solarctl::adapters::file_store::FileStore;
use solarctl::adapters::log_sink::{LogEventSink, init_logger};
use solarctl::adapters::serial::{self, SerialPortLink};
use solarctl::adapters::sun::SunPositionDaylight;
use solarctl::adapters::time::SystemClock;
use solarctl::app::service::{ControlEngine, CycleOutcome};
use solarctl::config::SystemConfig;
use solarctl::error::Error;
use solarctl::link::{LivenessLease, SerialProtocolHandler};

// ── Command line ──────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "solarctl", version, about = "Solar-thermal boiler controller")]
struct Cli {
    /// TOML configuration file; defaults are searched when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Runs the serial handler for the solar controller.
    Slave {
        /// Serial device; discovered by handshake when omitted.
        #[arg(long)]
        port: Option<String>,
    },
    /// Runs one decision cycle.
    Control {
        /// Keep running one cycle per control interval.
        #[arg(long)]
        r#loop: bool,
    },
    /// Lists serial ports.
    Ports,
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("solarctl: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SystemConfig::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    init_logger(&config.log_level);
    info!("solarctl v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Slave { port } => run_slave(config, port),
        Command::Control { r#loop } => run_control(&config, r#loop),
        Command::Ports => run_ports(),
    }
}

// ── slave ─────────────────────────────────────────────────────

fn run_slave(config: SystemConfig, port: Option<String>) -> Result<()> {
    let mut store = FileStore::open(config.store_dir.clone(), SystemClock)
        .with_context(|| format!("opening store {}", config.store_dir.display()))?;

    let lease = LivenessLease::new(&config.device_tag, config.lease_ttl_secs, config.lease_acquire);
    match lease.acquire(&mut store) {
        Ok(()) => {}
        Err(e @ Error::Ownership(_)) => {
            info!("Another slave owns '{}' ({e}), exiting", config.device_tag);
            return Ok(());
        }
        Err(e) => return Err(e).context("acquiring lease"),
    }

    let read_timeout = Duration::from_millis(config.serial_read_timeout_ms);
    let opened = match port.or_else(|| config.serial_port.clone()) {
        Some(path) => SerialPortLink::open(&path, config.serial_baud, read_timeout),
        None => serial::discover(
            &config.device_tag,
            config.serial_baud,
            read_timeout,
            Duration::from_millis(config.probe_timeout_ms),
        ),
    };
    let link = match opened {
        Ok(link) => link,
        Err(fault) => {
            warn!("No solar controller available: {fault}");
            if let Err(e) = lease.release(&mut store) {
                warn!("Could not release lease: {e}");
            }
            return Ok(());
        }
    };

    let mut handler = SerialProtocolHandler::new(link, store, SystemClock, LogEventSink::new(), config, lease);
    let err = match handler.start().and_then(|()| handler.run()) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    handler.shutdown(&err);

    if err.is_supervised_exit() {
        warn!("Serial handler stopped: {err}");
        Ok(())
    } else {
        Err(err).context("serial handler")
    }
}

// ── control ───────────────────────────────────────────────────

fn run_control(config: &SystemConfig, repeat: bool) -> Result<()> {
    let mut store = FileStore::open(config.store_dir.clone(), SystemClock)
        .with_context(|| format!("opening store {}", config.store_dir.display()))?;
    let daylight = SunPositionDaylight::new(config.latitude, config.longitude);
    let mut sink = LogEventSink::new();
    let engine = ControlEngine::new(config.clone());
    let interval = Duration::from_secs(config.control_interval_secs);

    loop {
        match engine.run_cycle(&mut store, &SystemClock, &daylight, &mut sink) {
            Ok(CycleOutcome::Completed { from, to }) if from != to => {
                info!("Cycle done: {from:?} -> {to:?}");
            }
            Ok(CycleOutcome::Completed { .. }) => {}
            Ok(CycleOutcome::Aborted(fault)) => warn!("Cycle aborted: {fault}"),
            Err(e) if repeat => error!("Cycle failed: {e}"),
            Err(e) => return Err(e).context("control cycle"),
        }
        if !repeat {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

// ── ports ─────────────────────────────────────────────────────

fn run_ports() -> Result<()> {
    let ports = serial::list_ports().context("enumerating serial ports")?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for p in ports {
        match p.description {
            Some(d) => println!("{}\t{}\t{}", p.name, p.kind, d),
            None => println!("{}\t{}", p.name, p.kind),
        }
    }
    Ok(())
}
