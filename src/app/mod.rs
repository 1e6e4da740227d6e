//! Application core: pure domain logic behind port traits.
//!
//! This module contains the business rules of the solar controller:
//! decision-cycle orchestration, safety guards and transition bookkeeping.
//! All interaction with the store, the clock and the sun oracle happens
//! through the **port traits** defined in [`ports`], keeping this layer
//! fully testable with in-memory adapters.

pub mod events;
pub mod ports;
pub mod service;
