//! AssayPilot kernel conformance suite.
//!
//! The library half holds what the integration tests share: condition
//! fixtures and a deterministic plate simulator that turns a decision into
//! the observation its execution would produce. The tests live under
//! `tests/`, split into end-to-end scenarios, properties and adversarial
//! cases.

pub mod fixtures;
pub mod plate;

pub use plate::PlateSimulator;
