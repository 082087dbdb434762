pub mod assay_gate;
pub mod biology;
pub mod cycle_zero;
pub mod gate_lock;
pub mod insolvency;
pub mod noise_gate;

pub use assay_gate::AssayGateStage;
pub use biology::BiologySelectionStage;
pub use cycle_zero::CycleZeroStage;
pub use gate_lock::GateLockStage;
pub use insolvency::InsolvencyStage;
pub use noise_gate::NoiseGateStage;

use crate::traits::PolicyStage;

/// The six stages in canonical order.
pub fn standard_pipeline() -> Vec<Box<dyn PolicyStage>> {
    vec![
        Box::new(InsolvencyStage),
        Box::new(GateLockStage),
        Box::new(CycleZeroStage),
        Box::new(NoiseGateStage),
        Box::new(AssayGateStage),
        Box::new(BiologySelectionStage),
    ]
}
