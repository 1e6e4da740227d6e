//! System configuration parameters
//!
//! All tunable parameters for the solar controller. Every field has a
//! default matching the installed system; a TOML file may override any
//! subset of them.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for every control-cycle duration (one day).
pub const MAX_CONTROL_DURATION_SECS: i64 = 86_400;

/// How the liveness lease is taken at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeaseAcquire {
    /// Conditional set-if-absent; closes the simultaneous-start race.
    Atomic,
    /// Existence check followed by a plain set (legacy behaviour).
    CheckThenSet,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Store ---
    /// Directory shared by the serial handler and the control engine.
    pub store_dir: PathBuf,
    /// Freshness TTL of temperature channels (seconds)
    pub telemetry_ttl_secs: u64,
    /// Capacity of the flow-out history list
    pub history_capacity: usize,

    // --- Serial link ---
    /// Explicit port path; probe all ports when `None`
    pub serial_port: Option<String>,
    pub serial_baud: u32,
    /// Read timeout of a single poll (milliseconds)
    pub serial_read_timeout_ms: u64,
    /// Sleep between polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Silence after which the link is considered lost (seconds)
    pub inactivity_timeout_secs: u64,
    /// Tag the microcontroller answers with when probed
    pub device_tag: String,
    /// How long to wait for a probe answer (milliseconds)
    pub probe_timeout_ms: u64,

    // --- Lease ---
    pub lease_ttl_secs: u64,
    pub lease_acquire: LeaseAcquire,

    // --- Control timing ---
    /// No normal-control transition before this much time in a state (seconds)
    pub grace_period_secs: i64,
    /// Extra delay stamped on entry to startup (seconds)
    pub startup_deferral_secs: i64,
    /// Time in overheat before retrying the large boiler (seconds)
    pub overheat_cooldown_secs: i64,
    /// Recycle timeout in winter months (seconds)
    pub recycle_timeout_winter_secs: i64,
    /// Recycle timeout outside winter (seconds)
    pub recycle_timeout_secs: i64,
    /// Interval between decision cycles in `--loop` mode (seconds)
    pub control_interval_secs: u64,

    // --- Control thresholds (Celsius) ---
    pub max_flow_out_c: f64,
    pub max_small_boiler_c: f64,
    pub legionella_c: f64,
    pub recycle_max_c: f64,
    pub recycle_retry_rise_c: f64,
    pub swap_boiler_rise_c: f64,
    pub min_flow_delta_c: f64,
    /// Flow delta meaning the sun is shining strongly
    pub large_flow_delta_c: f64,
    pub min_solar_pipe_c: f64,
    /// Use boiler temperature for control when the pipe exceeds it by this much
    pub boiler_control_offset_c: f64,
    pub defrost_aux_sum_c: f64,
    pub defrost_pipe_c: f64,

    // --- Location (daylight oracle) ---
    pub latitude: f64,
    pub longitude: f64,

    // --- Logging ---
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Store
            store_dir: PathBuf::from("/run/solarctl"),
            telemetry_ttl_secs: 60,
            history_capacity: 7200, // two hours at one record per second

            // Serial link
            serial_port: None,
            serial_baud: 9600,
            serial_read_timeout_ms: 100,
            poll_interval_ms: 150,
            inactivity_timeout_secs: 60,
            device_tag: "solar".to_string(),
            probe_timeout_ms: 2000,

            // Lease
            lease_ttl_secs: 60,
            lease_acquire: LeaseAcquire::Atomic,

            // Control timing
            grace_period_secs: 2 * 60,
            startup_deferral_secs: 10 * 60,
            overheat_cooldown_secs: 30 * 60,
            recycle_timeout_winter_secs: 30 * 60,
            recycle_timeout_secs: 10 * 60,
            control_interval_secs: 60,

            // Thresholds
            max_flow_out_c: 95.0,
            max_small_boiler_c: 70.0,
            legionella_c: 60.0,
            recycle_max_c: 40.0,
            recycle_retry_rise_c: 4.0,
            swap_boiler_rise_c: 5.0,
            min_flow_delta_c: 0.5,
            large_flow_delta_c: 2.0,
            min_solar_pipe_c: 20.0,
            boiler_control_offset_c: 5.0,
            defrost_aux_sum_c: 5.0,
            defrost_pipe_c: 10.0,

            // Location
            latitude: 50.803,
            longitude: 5.955,

            log_level: "info".to_string(),
        }
    }
}

impl SystemConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: SystemConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the first default location that
    /// exists, else fall back to defaults.
    ///
    /// An explicitly named file that fails to load is an error; a default
    /// location that fails to load is logged and skipped.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            let config = Self::load(path)?;
            info!("Config loaded from {}", path.display());
            return Ok(config);
        }

        let candidates = [
            PathBuf::from("solarctl.toml"),
            PathBuf::from("/etc/solarctl/solarctl.toml"),
        ];
        for candidate in &candidates {
            if candidate.exists() {
                match Self::load(candidate) {
                    Ok(config) => {
                        info!("Config loaded from {}", candidate.display());
                        return Ok(config);
                    }
                    Err(e) => warn!("Config at {} ignored: {}", candidate.display(), e),
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=3600).contains(&self.telemetry_ttl_secs) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_ttl_secs must be 5-3600",
            ));
        }
        if !(1..=100_000).contains(&self.history_capacity) {
            return Err(ConfigError::ValidationFailed(
                "history_capacity must be 1-100000",
            ));
        }
        if self.serial_baud == 0 {
            return Err(ConfigError::ValidationFailed("serial_baud must be > 0"));
        }
        if !(10..=5000).contains(&self.serial_read_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "serial_read_timeout_ms must be 10-5000",
            ));
        }
        if self.poll_interval_ms > 5000 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 0-5000",
            ));
        }
        if !(5..=3600).contains(&self.inactivity_timeout_secs) {
            return Err(ConfigError::ValidationFailed(
                "inactivity_timeout_secs must be 5-3600",
            ));
        }
        if !(5..=3600).contains(&self.lease_ttl_secs) {
            return Err(ConfigError::ValidationFailed(
                "lease_ttl_secs must be 5-3600",
            ));
        }
        if self.device_tag.is_empty() {
            return Err(ConfigError::ValidationFailed("device_tag must not be empty"));
        }
        let durations = [
            self.grace_period_secs,
            self.startup_deferral_secs,
            self.overheat_cooldown_secs,
            self.recycle_timeout_secs,
            self.recycle_timeout_winter_secs,
        ];
        if !durations.iter().all(|d| (0..=MAX_CONTROL_DURATION_SECS).contains(d)) {
            return Err(ConfigError::ValidationFailed(
                "control durations must be 0-86400 seconds",
            ));
        }
        if self.control_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "control_interval_secs must be > 0",
            ));
        }
        if !(40.0..=125.0).contains(&self.max_flow_out_c) {
            return Err(ConfigError::ValidationFailed(
                "max_flow_out_c must be 40.0-125.0",
            ));
        }
        if self.max_small_boiler_c >= self.max_flow_out_c {
            return Err(ConfigError::ValidationFailed(
                "max_small_boiler_c must be below max_flow_out_c",
            ));
        }
        if self.recycle_max_c >= self.legionella_c {
            return Err(ConfigError::ValidationFailed(
                "recycle_max_c must be below legionella_c",
            ));
        }
        if self.min_flow_delta_c <= 0.0 || self.large_flow_delta_c <= self.min_flow_delta_c {
            return Err(ConfigError::ValidationFailed(
                "flow deltas must satisfy 0 < min_flow_delta_c < large_flow_delta_c",
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(ConfigError::ValidationFailed(
                "latitude/longitude out of range",
            ));
        }
        Ok(())
    }
}
