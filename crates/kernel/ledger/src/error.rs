use thiserror::Error;

/// Errors from the evidence ledger and the decision log.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("cycle regression: ledger is at cycle {current}, got {requested}")]
    CycleRegression { current: u64, requested: u64 },

    #[error("event for cycle {event_cycle} appended while ledger is at cycle {current}")]
    CycleMismatch { current: u64, event_cycle: u64 },

    #[error("decision already recorded for cycle {0}")]
    DuplicateDecision(u64),

    #[error("decision for cycle {requested} is out of order (last recorded cycle {last})")]
    OutOfOrderDecision { last: u64, requested: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
