//! AssayPilot run loop.
//!
//! [`AgentLoop`] owns everything with a lifetime longer than one cycle: the
//! belief state, the chooser and its decision log, the debt enforcement
//! context and the audit sink. Each call to [`AgentLoop::run_cycle`] folds in
//! the cycle's observation, asks the chooser for one decision, authorizes it
//! and flushes the three record streams.

pub mod agent;
pub mod config;
pub mod error;
pub mod telemetry;

pub use agent::{AgentLoop, Authorization, CycleReport};
pub use config::RunConfig;
pub use error::RuntimeError;
pub use telemetry::init_tracing;
