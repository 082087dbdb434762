use tracing::warn;

use crate::context::{ChooserContext, StageResult};
use crate::decision::{CalibrationPlan, DecisionKind};
use crate::error::ChooserError;
use crate::template::Template;
use crate::traits::PolicyStage;

/// Stage 1: Insolvency
///
/// While epistemic debt sits at or above the hard block only calibration may
/// run. The stage forces a repayment calibration; when even that is
/// unaffordable it refuses, and after enough refusals in a row the run ends
/// in bankruptcy.
pub struct InsolvencyStage;

impl PolicyStage for InsolvencyStage {
    fn stage_name(&self) -> &str {
        "Insolvency"
    }

    fn stage_number(&self) -> u8 {
        1
    }

    fn enforcement_layer(&self) -> &'static str {
        "insolvency"
    }

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError> {
        let beliefs = context.beliefs;
        let layer = self.enforcement_layer();
        let wells = context
            .sizing
            .baseline_wells(beliefs, context.config, context.budget_remaining_wells);

        if beliefs.is_bankrupt() {
            warn!(
                refusals = beliefs.consecutive_refusals(),
                debt_bits = beliefs.debt_bits(),
                "Bankrupt: ending run"
            );
            let draft = context
                .abort(
                    layer,
                    "bankruptcy",
                    Template::BaselineReplicates,
                    wells,
                    format!(
                        "{} consecutive refusals with {:.3} bits of debt; no path back to solvency",
                        beliefs.consecutive_refusals(),
                        beliefs.debt_bits()
                    ),
                )
                .metric("consecutive_refusals", beliefs.consecutive_refusals() as f64)
                .threshold(
                    "max_consecutive_refusals",
                    beliefs.debt_policy().max_consecutive_refusals as f64,
                );
            return Ok(StageResult::Decide(draft));
        }

        if !beliefs.is_insolvent() {
            return Ok(StageResult::Continue);
        }

        let threshold = beliefs.debt_policy().hard_block_bits;
        if context.affordable(wells) {
            let draft = context
                .forced_calibration(
                    Template::BaselineReplicates,
                    wells,
                    layer,
                    "debt_repayment",
                    format!(
                        "debt {:.3} bits at or above {threshold:.3}; only calibration may run",
                        beliefs.debt_bits()
                    ),
                )
                .threshold("debt_hard_block_bits", threshold);
            return Ok(StageResult::Decide(draft));
        }

        let reason = format!(
            "debt {:.3} bits blocks biology and repayment needs {wells} wells, {} remain",
            beliefs.debt_bits(),
            context.budget_remaining_wells
        );
        warn!(wells, budget = context.budget_remaining_wells, "Insolvent and cannot repay: refusing");
        let draft = context
            .draft(DecisionKind::Refusal, None)
            .forced(layer)
            .trigger("insolvent_unaffordable")
            .attempted(Template::BaselineReplicates)
            .plan(CalibrationPlan {
                template: Template::BaselineReplicates,
                wells,
                reason: reason.clone(),
            })
            .summary(reason)
            .rule("insolvency:refuse")
            .threshold("debt_hard_block_bits", threshold);
        Ok(StageResult::Decide(draft))
    }
}
