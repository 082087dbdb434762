//! Decision Pipeline: one canonical, auditable decision per cycle.
//!
//! The chooser runs a strictly ordered, short-circuiting sequence of
//! enforcement stages over the belief state and the remaining well budget:
//!
//! 1. **Insolvency**: debt at/above the hard block allows only calibration;
//!    repeated refusals end the run with a bankruptcy abort.
//! 2. **Gate lock**: a revoked noise gate forces recalibration.
//! 3. **Cycle zero**: a fixed, spatially diverse calibration plate runs once.
//! 4. **Noise gate**: edge/center characterization or baseline replicates
//!    until the noise gate is earned.
//! 5. **Assay gates**: cheap assay calibrations in ladder order.
//! 6. **Biology**: position-coverage check, then exploration.
//!
//! The first stage that decides ends the cycle. Every decision carries a
//! [`Receipt`]; [`receipt::validate`] runs after every invocation and halts
//! the process on an incomplete one.

pub mod chooser;
pub mod config;
pub mod context;
pub mod decision;
pub mod enforcement;
pub mod error;
pub mod receipt;
pub mod sizing;
pub mod stages;
pub mod template;
pub mod traits;

#[cfg(test)]
mod testing;

pub use chooser::Chooser;
pub use config::ChooserConfig;
pub use context::{BiologyCandidate, ChooserContext, DecisionDraft, StageResult};
pub use decision::{CalibrationPlan, Decision, DecisionKind, Rationale, Receipt};
pub use enforcement::{DebtEnforcer, EnforcementContext, EnforcementViolation};
pub use error::ChooserError;
pub use sizing::AmortizedBatchSizing;
pub use template::{ActionClass, Template};
pub use traits::{BatchSizingPolicy, PolicyStage};
