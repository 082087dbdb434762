use assaypilot_belief::GateAxis;
use tracing::debug;

use crate::context::{ChooserContext, StageResult};
use crate::error::ChooserError;
use crate::template::Template;
use crate::traits::PolicyStage;

/// Stage 4: Noise Gate
///
/// Until the noise gate is earned, every cycle is vehicle calibration. Once
/// enough df exist but the edge effect is still unresolved, an edge-vs-center
/// test runs first; otherwise baseline replicates sized by the batch-sizing
/// policy.
pub struct NoiseGateStage;

impl PolicyStage for NoiseGateStage {
    fn stage_name(&self) -> &str {
        "Noise Gate"
    }

    fn stage_number(&self) -> u8 {
        4
    }

    fn enforcement_layer(&self) -> &'static str {
        "noise_gate"
    }

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError> {
        let beliefs = context.beliefs;
        if beliefs.is_earned(GateAxis::Noise) {
            return Ok(StageResult::Continue);
        }

        let noise = beliefs.noise();
        let policy = beliefs.policy();
        let edge_unresolved = !beliefs.edge().confident;

        let (template, wells, trigger, summary) = if noise.df >= policy.df_floor && edge_unresolved {
            (
                Template::EdgeCenterTest,
                context.config.edge_test_wells,
                "edge_effect_unresolved",
                format!(
                    "df {} past the floor; characterizing edge vs center before more replicates",
                    noise.df
                ),
            )
        } else {
            let wells = context
                .sizing
                .baseline_wells(beliefs, context.config, context.budget_remaining_wells);
            (
                Template::BaselineReplicates,
                wells,
                "noise_gate_not_earned",
                format!(
                    "noise gate {} (df {}, streak {}/{})",
                    noise.state, noise.df, noise.streak, policy.streak_required
                ),
            )
        };
        debug!(template = template.name(), wells, trigger, "Noise gate not earned");

        let draft = context
            .forced_calibration(template, wells, self.enforcement_layer(), trigger, summary)
            .overriding(context.candidate(), vec![GateAxis::Noise.name().to_string()])
            .metric("noise_streak", f64::from(noise.streak))
            .metric("edge_tests", beliefs.edge().tests as f64)
            .threshold("df_floor", policy.df_floor as f64)
            .threshold("rel_width_enter", policy.enter_rel_width)
            .threshold("streak_required", f64::from(policy.streak_required));
        Ok(StageResult::Decide(draft))
    }
}
