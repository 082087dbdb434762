use assaypilot_belief::BeliefError;
use assaypilot_chooser::ChooserError;
use assaypilot_ledger::LedgerError;
use thiserror::Error;

/// Errors from the run loop.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("observation for cycle {got} passed to cycle {expected}")]
    CycleMismatch { expected: u64, got: u64 },

    #[error("run ended at cycle {0}; no further cycles")]
    Terminated(u64),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("belief error: {0}")]
    Belief(#[from] BeliefError),

    #[error("chooser error: {0}")]
    Chooser(#[from] ChooserError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
