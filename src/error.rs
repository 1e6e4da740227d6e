//! Unified error types for the solar controller.
//!
//! [`Error`] is what the two long-running processes propagate. Faults that
//! are handled where they arise travel as their own types instead:
//!
//! | Type                | Raised by            | Consequence                        |
//! |---------------------|----------------------|------------------------------------|
//! | `SensorFault`       | control engine       | `error` state, cycle aborted       |
//! | `ProtocolFault`     | serial record parser | record dropped                     |
//! | `Error::Link`       | serial handler       | process exits, supervisor restarts |
//! | `Error::Ownership`  | liveness lease       | newer instance exits at start      |
//! | `Error::Store`      | store adapters       | propagated                         |
//! | `ConfigError`       | config loader        | start-up refused                   |

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Propagated failures of the serial handler and the control engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("link: {0}")]
    Link(#[from] LinkFault),
    #[error("ownership: {0}")]
    Ownership(#[from] OwnershipConflict),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Faults that end the serial handler process with exit code 0 so the
    /// supervisor restarts it.
    pub fn is_supervised_exit(&self) -> bool {
        matches!(self, Self::Link(_) | Self::Ownership(_))
    }
}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

/// Required telemetry is missing or has expired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorFault {
    #[error("required channel {0} is absent or stale")]
    MissingChannel(&'static str),
    #[error("channel {key} holds unparsable value '{value}'")]
    Unparsable { key: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Protocol faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolFault {
    /// Record did not have the telemetry field count.
    #[error("garbage record ({fields} fields): {line}")]
    Garbage { fields: usize, line: String },
    /// A partial record outgrew the reassembly buffer.
    #[error("record exceeds {0} bytes, discarded")]
    Oversize(usize),
}

// ---------------------------------------------------------------------------
// Hardware link faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkFault {
    #[error("no serial port answered as '{0}'")]
    PortNotFound(String),
    #[error("failed to open {port}: {reason}")]
    OpenFailed { port: String, reason: String },
    #[error("write to controller failed: {0}")]
    WriteFailed(String),
    #[error("read from controller failed: {0}")]
    ReadFailed(String),
    #[error("no record received for {0}s")]
    Inactivity(u64),
}

// ---------------------------------------------------------------------------
// Ownership conflicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lease {key} already held")]
pub struct OwnershipConflict {
    pub key: String,
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("key {0} holds the wrong kind of value")]
    WrongKind(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A field failed range validation. Describes which field and why.
    #[error("validation failed: {0}")]
    ValidationFailed(&'static str),
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
