//! solarctl library.
//!
//! Two cooperating processes share one channel store:
//!
//! - the serial slave (`link`) owns the microcontroller port, publishes
//!   telemetry and pushes the commanded state back on every record;
//! - the control engine (`app::service`) runs one decision cycle per
//!   interval and writes the commanded state.
//!
//! Everything behind a port trait is exposed for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod keys;
pub mod link;
pub mod safety;
pub mod season;
pub mod sensors;
