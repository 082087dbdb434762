use assaypilot_belief::{AssayAxis, BeliefState};
use tracing::{debug, warn};

use crate::context::{ChooserContext, StageResult};
use crate::error::ChooserError;
use crate::template::Template;
use crate::traits::PolicyStage;

/// Stage 5: Assay Gates
///
/// Walks the required assay gates in ladder order and forces the calibration
/// for the first one still missing. A required gate whose prerequisite is
/// itself unearned calibrates the prerequisite first.
pub struct AssayGateStage;

/// Lowest unearned assay axis on the prerequisite chain below `axis`.
fn lowest_unearned(beliefs: &BeliefState, axis: AssayAxis) -> AssayAxis {
    let mut target = axis;
    while let Some(prereq) = target.gate_axis().prerequisite().and_then(|g| g.assay_axis()) {
        if beliefs.is_earned(prereq.gate_axis()) {
            break;
        }
        target = prereq;
    }
    target
}

impl PolicyStage for AssayGateStage {
    fn stage_name(&self) -> &str {
        "Assay Gates"
    }

    fn stage_number(&self) -> u8 {
        5
    }

    fn enforcement_layer(&self) -> &'static str {
        "assay_gate"
    }

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError> {
        let beliefs = context.beliefs;
        let mut required: Vec<AssayAxis> = context.config.required_assay_gates.clone();
        required.sort_by_key(|a| AssayAxis::LADDER.iter().position(|l| l == a));
        let missing: Vec<String> = required
            .iter()
            .filter(|a| !beliefs.is_earned(a.gate_axis()))
            .map(|a| a.gate_axis().name().to_string())
            .collect();
        let Some(&first) = required.iter().find(|a| !beliefs.is_earned(a.gate_axis())) else {
            return Ok(StageResult::Continue);
        };

        let axis = lowest_unearned(beliefs, first);
        let template = Template::for_assay(axis);
        let wells = context.sizing.assay_wells(axis, beliefs, context.config);
        let layer = self.enforcement_layer();
        let state = beliefs.assay(axis);
        debug!(axis = axis.name(), template = template.name(), wells, "Assay gate missing");

        if template.requires_authorization() && !context.allow_expensive_calibration {
            warn!(template = template.name(), "Expensive calibration not authorized");
            let draft = context
                .abort(
                    layer,
                    "unauthorized_expensive_calibration",
                    template,
                    wells,
                    format!(
                        "{} gate required but {template} needs explicit authorization",
                        axis.name()
                    ),
                )
                .overriding(context.candidate(), missing);
            return Ok(StageResult::Decide(draft));
        }

        let draft = context
            .forced_calibration(
                template,
                wells,
                layer,
                "assay_gate_not_earned",
                format!(
                    "{} gate {} (df {}, measured df {})",
                    axis.name(),
                    state.state,
                    state.df,
                    state.measured_df
                ),
            )
            .overriding(context.candidate(), missing)
            .metric("assay_df", state.df as f64)
            .maybe_metric("assay_rel_width", state.rel_width)
            .parameters(serde_json::json!({
                "compound": assaypilot_belief::VEHICLE,
                "assay": axis.assay_kind().name(),
                "wells": wells,
                "positions": ["center", "edge"],
            }));
        Ok(StageResult::Decide(draft))
    }
}
