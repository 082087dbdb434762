use assaypilot_belief::{AssayAxis, BeliefState, Position};

use crate::config::ChooserConfig;
use crate::context::{ChooserContext, StageResult};
use crate::error::ChooserError;

/// One enforcement stage of the decision pipeline.
///
/// Stages run in `stage_number` order. The first one to return
/// [`StageResult::Decide`] ends the cycle.
pub trait PolicyStage: Send + Sync {
    /// Human-readable name of this stage.
    fn stage_name(&self) -> &str;

    /// Position (1-6) in the pipeline.
    fn stage_number(&self) -> u8;

    /// Tag written to `enforcement_layer` when this stage forces a decision.
    fn enforcement_layer(&self) -> &'static str;

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError>;
}

/// How many wells a calibration batch should use.
///
/// Before the noise gate is earned the trade-off favours fewer cycles; after
/// it, fewer wells.
pub trait BatchSizingPolicy: Send + Sync {
    /// Vehicle-control replicates for the noise axis.
    fn baseline_wells(&self, beliefs: &BeliefState, config: &ChooserConfig, budget: u32) -> u32;

    /// Vehicle-control wells expected to earn an assay gate.
    fn assay_wells(&self, axis: AssayAxis, beliefs: &BeliefState, config: &ChooserConfig) -> u32;

    /// Baseline wells that bring `position` up to the coverage minimums in
    /// one batch.
    fn coverage_wells(
        &self,
        position: Position,
        beliefs: &BeliefState,
        config: &ChooserConfig,
        budget: u32,
    ) -> u32;
}
