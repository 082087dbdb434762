use tracing::info;

use crate::context::{ChooserContext, StageResult};
use crate::error::ChooserError;
use crate::template::Template;
use crate::traits::PolicyStage;

/// Stage 3: Cycle Zero
///
/// The first cycle always runs one fixed-size, full-plate vehicle calibration
/// covering center and edge wells. The size is fixed, not computed.
pub struct CycleZeroStage;

impl PolicyStage for CycleZeroStage {
    fn stage_name(&self) -> &str {
        "Cycle Zero"
    }

    fn stage_number(&self) -> u8 {
        3
    }

    fn enforcement_layer(&self) -> &'static str {
        "cycle0"
    }

    fn evaluate(&self, context: &mut ChooserContext<'_>) -> Result<StageResult, ChooserError> {
        if context.cycle != 0 {
            return Ok(StageResult::Continue);
        }
        let wells = context.config.cycle0_wells;
        info!(wells, "Cycle 0: mandatory full-plate calibration");
        let draft = context
            .forced_calibration(
                Template::Cycle0FullPlate,
                wells,
                self.enforcement_layer(),
                "cycle0_mandatory",
                "first cycle runs a full-plate vehicle calibration",
            )
            .threshold("cycle0_wells", f64::from(wells));
        Ok(StageResult::Decide(draft))
    }
}
