use assaypilot_ledger::LedgerError;
use thiserror::Error;

/// Recoverable belief errors.
///
/// Covenant violations never appear here; they halt through
/// [`assaypilot_ledger::breach`].
#[derive(Error, Debug)]
pub enum BeliefError {
    #[error(
        "temporal causality violation on {field}: claim about t={claim_time_h}h \
         uses evidence from t={evidence_time_h}h"
    )]
    TemporalCausality {
        field: String,
        claim_time_h: f64,
        evidence_time_h: f64,
    },

    #[error("claim about t={claim_time_h}h on {field} carries no evidence time")]
    MissingEvidenceTime { field: String, claim_time_h: f64 },

    #[error("field {field} expects {expected}, got {got}")]
    FieldType {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{what} must be a finite non-negative number of bits, got {bits}")]
    InvalidBits { what: &'static str, bits: f64 },

    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
