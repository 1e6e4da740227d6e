//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem against mock adapters. No
//! serial hardware is needed.

mod control_scenarios;
mod handler_tests;
mod lease_tests;
mod mocks;
