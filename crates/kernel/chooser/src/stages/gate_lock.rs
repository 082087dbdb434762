use assaypilot_belief::{GateAxis, GateState};
use assaypilot_ledger::{breach, Covenant, CovenantViolation};
use tracing::warn;

use crate::context::{ChooserContext, StageResult};
use crate::error::ChooserError;
use crate::template::Template;
use crate::traits::PolicyStage;

/// Stage 2: Gate Lock
///
/// Once the noise gate has been earned, losing it forces recalibration before
/// anything else. Also re-checks the stored estimates behind an earned gate:
/// a stable flag with no width estimate is a covenant breach.
pub struct GateLockStage;

impl GateLockStage {
    /// Why an earned-or-revoked noise gate cannot be trusted, if it can't.
    fn disqualified(context: &ChooserContext<'_>) -> Option<&'static str> {
        let noise = context.beliefs.noise();
        let policy = context.beliefs.policy();

        if noise.stable && noise.rel_width.is_none() {
            breach(CovenantViolation::new(
                Covenant::StableImpliesWidth,
                format!(
                    "noise gate marked stable with no width estimate (df {})",
                    noise.df
                ),
            ));
        }

        match noise.state {
            GateState::Revoked => Some("gate_revoked"),
            GateState::Earned => {
                if noise.rel_width.is_some_and(|w| w >= policy.exit_rel_width) {
                    Some("width_at_exit")
                } else if noise.drift.is_some_and(|d| d >= policy.drift_threshold) {
                    Some("drift_at_threshold")
                } else {
                    None
                }
            }
            GateState::Undetermined => None,
        }
    }
}

impl PolicyStage for GateLockStage {
    fn stage_name(&self) -> &str {
        "Gate Lock"
    }

    fn stage_number(&self) -> u8 {
        2
    }

    fn enforcement_layer(&self) -> &'static str {
        "gate_lock"
    }

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError> {
        let Some(trigger) = Self::disqualified(context) else {
            return Ok(StageResult::Continue);
        };

        let beliefs = context.beliefs;
        let policy = beliefs.policy();
        warn!(
            trigger,
            rel_width = ?beliefs.noise().rel_width,
            drift = ?beliefs.noise().drift,
            "Noise gate lost: forcing recalibration"
        );

        let wells = context
            .sizing
            .baseline_wells(beliefs, context.config, context.budget_remaining_wells);
        let draft = context
            .forced_calibration(
                Template::BaselineReplicates,
                wells,
                self.enforcement_layer(),
                trigger,
                "noise gate lost; recalibrating before any biology",
            )
            .overriding(context.candidate(), vec![GateAxis::Noise.name().to_string()])
            .maybe_metric("noise_drift", beliefs.noise().drift)
            .threshold("rel_width_exit", policy.exit_rel_width)
            .threshold("drift_threshold", policy.drift_threshold);
        Ok(StageResult::Decide(draft))
    }
}
