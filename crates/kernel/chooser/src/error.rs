use assaypilot_belief::BeliefError;
use assaypilot_ledger::LedgerError;
use thiserror::Error;

/// Errors from the decision pipeline.
///
/// Affordability and policy failures are not errors: they come back as abort
/// decisions.
#[derive(Error, Debug)]
pub enum ChooserError {
    #[error("pipeline misconfigured: {0}")]
    PipelineMisconfigured(String),

    #[error("no stage produced a decision for cycle {0}")]
    NoDecision(u64),

    #[error(
        "{template} blocked: epistemic debt {debt_bits:.3} bits at or above {threshold:.3}"
    )]
    DebtBlocked {
        template: String,
        debt_bits: f64,
        threshold: f64,
    },

    #[error("{kind} decisions cannot be executed")]
    NotExecutable { kind: String },

    #[error("belief error: {0}")]
    Belief(#[from] BeliefError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
