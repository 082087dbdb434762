use assaypilot_belief::AssayAxis;
use serde::{Deserialize, Serialize};

/// Size of the mandatory first-cycle plate.
pub const CYCLE0_WELLS: u32 = 96;
pub const COVERAGE_MIN_FRACTION: f64 = 0.10;
pub const COVERAGE_MIN_WELLS: u64 = 8;
/// Smallest calibration batch worth a cycle's fixed cost.
pub const MIN_BATCH_WELLS: u32 = 12;
pub const EDGE_TEST_WELLS: u32 = 24;

/// Configuration for the chooser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChooserConfig {
    /// Compounds available for exploration, in priority order.
    pub compound_library: Vec<String>,
    pub cell_lines: Vec<String>,
    pub dose_ladder_um: Vec<f64>,
    pub timepoints_h: Vec<f64>,
    pub replicates: u32,
    pub cycle0_wells: u32,
    pub min_batch_wells: u32,
    pub edge_test_wells: u32,
    pub coverage_min_fraction: f64,
    pub coverage_min_wells: u64,
    /// Assay gates that must be earned before biology, in ladder order.
    pub required_assay_gates: Vec<AssayAxis>,
    /// Fraction of the drift threshold at which an exhausted explorer spends
    /// a cycle on calibration maintenance instead of proposing.
    pub maintenance_drift_fraction: f64,
}

impl Default for ChooserConfig {
    fn default() -> Self {
        Self {
            compound_library: ["tbhp", "staurosporine", "tunicamycin", "cccp", "nocodazole"]
                .into_iter()
                .map(String::from)
                .collect(),
            cell_lines: vec!["A549".to_string(), "HepG2".to_string()],
            dose_ladder_um: vec![0.1, 1.0, 10.0, 100.0],
            timepoints_h: vec![12.0, 24.0, 48.0],
            replicates: 3,
            cycle0_wells: CYCLE0_WELLS,
            min_batch_wells: MIN_BATCH_WELLS,
            edge_test_wells: EDGE_TEST_WELLS,
            coverage_min_fraction: COVERAGE_MIN_FRACTION,
            coverage_min_wells: COVERAGE_MIN_WELLS,
            required_assay_gates: vec![AssayAxis::Ldh, AssayAxis::CellPaint],
            maintenance_drift_fraction: 0.5,
        }
    }
}
