use assaypilot_belief::{BeliefState, GateAxis, Position};
use tracing::{debug, info};

use crate::config::ChooserConfig;
use crate::context::{BiologyCandidate, ChooserContext, StageResult};
use crate::decision::DecisionKind;
use crate::error::ChooserError;
use crate::template::Template;
use crate::traits::PolicyStage;

/// Biology the exploration heuristics would run next, if any.
///
/// Under-tested compounds come first (a coarse dose ladder on the first cell
/// line). Once the library is covered, a time course runs until time
/// dependence has been observed.
pub fn select_candidate(beliefs: &BeliefState, config: &ChooserConfig) -> Option<BiologyCandidate> {
    let cell_line = config.cell_lines.first()?.clone();
    let tested = &beliefs.exploration().tested_compounds;

    if let Some(compound) = config
        .compound_library
        .iter()
        .find(|c| !tested.iter().any(|t| t.eq_ignore_ascii_case(c)))
    {
        let timepoint = config
            .timepoints_h
            .get(config.timepoints_h.len() / 2)
            .copied()
            .unwrap_or(24.0);
        return Some(BiologyCandidate {
            template: Template::DoseLadderCoarse,
            compound: compound.clone(),
            cell_line,
            doses_um: config.dose_ladder_um.clone(),
            timepoints_h: vec![timepoint],
            replicates: config.replicates,
            reason: "untested_compound",
        });
    }

    if !beliefs.response().time_dependence_seen {
        let compound = config.compound_library.first()?.clone();
        let dose = config
            .dose_ladder_um
            .get(config.dose_ladder_um.len() / 2)
            .copied()
            .unwrap_or(1.0);
        return Some(BiologyCandidate {
            template: Template::TimeCourse,
            compound,
            cell_line,
            doses_um: vec![dose],
            timepoints_h: config.timepoints_h.clone(),
            replicates: config.replicates,
            reason: "time_dependence_unobserved",
        });
    }

    None
}

/// Stage 6: Biology Selection
///
/// Reached only with every mandatory gate earned. Checks that calibration
/// has characterized every position the candidate uses, then runs the
/// candidate. With nothing left to explore it maintains calibration while
/// drift creeps up, or proposes widening the library.
pub struct BiologySelectionStage;

impl BiologySelectionStage {
    /// First position the candidate uses that calibration hasn't covered.
    fn coverage_gap(
        context: &ChooserContext<'_>,
        candidate: &BiologyCandidate,
    ) -> Option<(Position, u64, f64)> {
        let exploration = context.beliefs.exploration();
        let total = exploration.calibration_wells_total();
        candidate.template.positions().iter().find_map(|&position| {
            let wells = exploration.calibration_wells_at(position.name());
            let fraction = if total == 0 {
                0.0
            } else {
                wells as f64 / total as f64
            };
            let covered = wells >= context.config.coverage_min_wells
                && fraction >= context.config.coverage_min_fraction;
            (!covered).then_some((position, wells, fraction))
        })
    }
}

impl PolicyStage for BiologySelectionStage {
    fn stage_name(&self) -> &str {
        "Biology Selection"
    }

    fn stage_number(&self) -> u8 {
        6
    }

    fn enforcement_layer(&self) -> &'static str {
        "position_coverage"
    }

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError> {
        let beliefs = context.beliefs;
        let config = context.config;

        let Some(candidate) = context.candidate().cloned() else {
            let noise = beliefs.noise();
            let maintenance_at = beliefs.policy().drift_threshold * config.maintenance_drift_fraction;
            if noise.drift.is_some_and(|d| d >= maintenance_at) {
                let wells = config.min_batch_wells;
                info!(drift = ?noise.drift, "Exploration exhausted: calibration maintenance");
                let draft = if context.affordable(wells) {
                    context
                        .draft(DecisionKind::Calibration, Some(Template::BaselineReplicates))
                        .trigger("calibration_maintenance")
                        .wells(wells)
                        .parameters(serde_json::json!({
                            "compound": assaypilot_belief::VEHICLE,
                            "wells": wells,
                            "positions": ["center", "edge"],
                        }))
                        .summary("exploration exhausted and drift rising; topping up vehicle controls")
                        .rule("biology:maintenance")
                        .maybe_metric("noise_drift", noise.drift)
                        .threshold("maintenance_drift", maintenance_at)
                } else {
                    context.abort(
                        "biology",
                        "calibration_unaffordable",
                        Template::BaselineReplicates,
                        wells,
                        format!(
                            "maintenance needs {wells} wells, {} remain",
                            context.budget_remaining_wells
                        ),
                    )
                };
                return Ok(StageResult::Decide(draft));
            }

            info!(
                tested = beliefs.exploration().tested_compounds.len(),
                "Exploration exhausted: proposing library expansion"
            );
            let draft = context
                .draft(DecisionKind::Proposal, Some(Template::ProposeLibraryExpansion))
                .trigger("exploration_exhausted")
                .parameters(serde_json::json!({
                    "tested_compounds": beliefs.exploration().tested_compounds,
                    "tested_cell_lines": beliefs.exploration().tested_cell_lines,
                }))
                .summary("every library compound tested and time dependence observed")
                .rule("biology:propose");
            return Ok(StageResult::Decide(draft));
        };

        if let Some((position, wells_at, fraction)) = Self::coverage_gap(context, &candidate) {
            debug!(
                position = position.name(),
                wells = wells_at,
                fraction,
                "Calibration coverage gap"
            );
            let wells = context.sizing.coverage_wells(
                position,
                beliefs,
                config,
                context.budget_remaining_wells,
            );
            let draft = context
                .forced_calibration(
                    Template::BaselineReplicates,
                    wells,
                    self.enforcement_layer(),
                    "position_coverage_gap",
                    format!(
                        "{} has {wells_at} calibration wells ({:.1}%); {} would run uncharacterized",
                        position,
                        fraction * 100.0,
                        candidate.template
                    ),
                )
                .overriding(Some(&candidate), vec![format!("coverage:{position}")])
                .metric("position_wells", wells_at as f64)
                .metric("position_fraction", fraction)
                .threshold("coverage_min_wells", config.coverage_min_wells as f64)
                .threshold("coverage_min_fraction", config.coverage_min_fraction);
            return Ok(StageResult::Decide(draft));
        }

        let wells = candidate.wells();
        if !context.affordable(wells) {
            let draft = context.abort(
                "biology",
                "biology_unaffordable",
                candidate.template,
                wells,
                format!(
                    "{} on {} needs {wells} wells, {} remain",
                    candidate.template, candidate.compound, context.budget_remaining_wells
                ),
            );
            return Ok(StageResult::Decide(draft));
        }

        info!(
            template = candidate.template.name(),
            compound = %candidate.compound,
            wells,
            "Selecting biology"
        );
        let draft = context
            .draft(DecisionKind::Biology, Some(candidate.template))
            .trigger(candidate.reason)
            .wells(wells)
            .parameters(candidate.parameters())
            .summary(format!(
                "{} of {} on {}",
                candidate.template, candidate.compound, candidate.cell_line
            ))
            .rule(format!("biology:{}", candidate.reason))
            .metric("noise_streak", f64::from(beliefs.noise().streak))
            .maybe_metric("noise_drift", beliefs.noise().drift)
            .metric(
                "gates_earned",
                GateAxis::ALL.iter().filter(|&&a| beliefs.is_earned(a)).count() as f64,
            );
        Ok(StageResult::Decide(draft))
    }
}
