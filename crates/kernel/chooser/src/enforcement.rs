//! Debt enforcement at execution time.
//!
//! The pipeline already routes insolvent cycles to calibration. The enforcer
//! is the second check, applied by the run loop right before an action is
//! executed: non-calibration actions are blocked while debt is at or above
//! the hard block. Violations are kept in an [`EnforcementContext`] owned by
//! the caller.

use assaypilot_belief::BeliefState;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{Decision, DecisionKind};
use crate::error::ChooserError;

/// A blocked attempt to execute a non-calibration action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnforcementViolation {
    pub cycle: u64,
    pub decision_id: String,
    pub template: String,
    pub debt_bits: f64,
    pub threshold: f64,
}

/// Violation log for one run.
#[derive(Clone, Debug, Default)]
pub struct EnforcementContext {
    violations: Vec<EnforcementViolation>,
}

impl EnforcementContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, violation: EnforcementViolation) {
        self.violations.push(violation);
    }

    pub fn violations(&self) -> &[EnforcementViolation] {
        &self.violations
    }

    pub fn clear(&mut self) {
        self.violations.clear();
    }
}

/// Blocks biology and proposals while the agent is insolvent.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebtEnforcer;

impl DebtEnforcer {
    /// Authorize `decision` for execution.
    ///
    /// Calibration always passes. A blocked action is recorded in `context`
    /// and counted as a refusal on `beliefs`.
    pub fn authorize(
        &self,
        decision: &Decision,
        beliefs: &mut BeliefState,
        context: &mut EnforcementContext,
    ) -> Result<(), ChooserError> {
        match decision.kind {
            DecisionKind::Calibration => {
                debug!(cycle = decision.cycle, "Calibration authorized");
                Ok(())
            }
            DecisionKind::Abort | DecisionKind::Refusal => Err(ChooserError::NotExecutable {
                kind: decision.kind.name().to_string(),
            }),
            DecisionKind::Biology | DecisionKind::Proposal => {
                let debt_bits = beliefs.debt_bits();
                let threshold = beliefs.debt_policy().hard_block_bits;
                if debt_bits < threshold {
                    return Ok(());
                }
                let template = decision.receipt.template.clone();
                warn!(
                    cycle = decision.cycle,
                    template = %template,
                    debt_bits,
                    threshold,
                    "Debt block: action refused"
                );
                context.record(EnforcementViolation {
                    cycle: decision.cycle,
                    decision_id: decision.decision_id.clone(),
                    template: template.clone(),
                    debt_bits,
                    threshold,
                });
                beliefs.record_refusal(&format!("debt_block:{template}"))?;
                Err(ChooserError::DebtBlocked {
                    template,
                    debt_bits,
                    threshold,
                })
            }
        }
    }
}
