use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Process-wide invariants whose violation means the kernel itself is broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Covenant {
    /// Every decision carries a complete receipt.
    ReceiptComplete,
    /// Every belief change is declared by an evidence event (covenant 7).
    EvidencePerMutation,
    /// Gate-type fields change only with a gate marker.
    GateMarkerRequired,
    /// A stable gate always has a width estimate behind it.
    StableImpliesWidth,
    /// Aborts and refusals say what was attempted.
    RefusalExplained,
}

impl fmt::Display for Covenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Covenant::ReceiptComplete => "receipt-complete",
            Covenant::EvidencePerMutation => "evidence-per-mutation",
            Covenant::GateMarkerRequired => "gate-marker-required",
            Covenant::StableImpliesWidth => "stable-implies-width",
            Covenant::RefusalExplained => "refusal-explained",
        };
        f.write_str(name)
    }
}

/// A detected covenant violation.
///
/// Never returned through a `Result` to callers of the kernel: detection sites
/// hand it to [`breach`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("covenant violated [{covenant}]: {message}")]
pub struct CovenantViolation {
    pub covenant: Covenant,
    pub message: String,
}

impl CovenantViolation {
    pub fn new(covenant: Covenant, message: impl Into<String>) -> Self {
        Self {
            covenant,
            message: message.into(),
        }
    }
}

/// Fatal channel for covenant violations. Logs and panics; never returns.
#[track_caller]
pub fn breach(violation: CovenantViolation) -> ! {
    error!(
        covenant = %violation.covenant,
        message = %violation.message,
        "Covenant breach, halting"
    );
    panic!("{violation}")
}
