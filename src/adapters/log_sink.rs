//! Log-based event sink adapter and logger set-up.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade. [`init_logger`] installs `env_logger` as the host
//! backend; `RUST_LOG` overrides the configured level.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::CycleStarted(state) => {
                info!(
                    "CYCLE | persisted_state={}",
                    state.map_or("<none>", |s| s.name())
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!(
                    "STATE | {} -> {}",
                    from.map_or("<none>", |s| s.name()),
                    to
                );
            }
            AppEvent::SensorFault(fault) => {
                error!("FAULT | {fault}, going into error state");
            }
            AppEvent::LinkUp { port } => {
                info!("LINK  | up on {port}");
            }
            AppEvent::Divergence {
                commanded,
                observed,
            } => {
                warn!("LINK  | hardware reports {observed}, commanded {commanded}");
            }
            AppEvent::ReadingRejected { key, raw } => {
                warn!("READ  | {key} rejected '{raw}'");
            }
            AppEvent::LinkDown { reason } => {
                error!("LINK  | down: {reason}");
            }
        }
    }
}

/// Install `env_logger` with `level` as the default filter.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
