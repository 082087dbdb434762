use serde::{Deserialize, Serialize};

pub const GATE_ENTER_REL_WIDTH: f64 = 0.25;
pub const GATE_EXIT_REL_WIDTH: f64 = 0.40;
pub const DF_SANITY_FLOOR: u64 = 40;
pub const DRIFT_THRESHOLD: f64 = 0.20;
/// Consecutive qualifying cycles before the noise gate is earned.
pub const STABILITY_STREAK: u32 = 3;
pub const DRIFT_WINDOW: usize = 3;
pub const SIGMA_HISTORY_LEN: usize = 20;
pub const EDGE_EMA_ALPHA: f64 = 0.3;
pub const EDGE_MIN_TESTS: u64 = 2;
pub const DEBT_HARD_BLOCK_BITS: f64 = 2.0;
pub const MAX_CONSECUTIVE_REFUSALS: u64 = 3;

/// Thresholds of the gate state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    /// Relative CI width at or below which a reading qualifies.
    pub enter_rel_width: f64,
    /// Relative CI width at or above which an earned gate is revoked.
    pub exit_rel_width: f64,
    pub df_floor: u64,
    pub drift_threshold: f64,
    pub streak_required: u32,
    pub drift_window: usize,
    pub history_len: usize,
    pub edge_ema_alpha: f64,
    pub edge_min_tests: u64,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            enter_rel_width: GATE_ENTER_REL_WIDTH,
            exit_rel_width: GATE_EXIT_REL_WIDTH,
            df_floor: DF_SANITY_FLOOR,
            drift_threshold: DRIFT_THRESHOLD,
            streak_required: STABILITY_STREAK,
            drift_window: DRIFT_WINDOW,
            history_len: SIGMA_HISTORY_LEN,
            edge_ema_alpha: EDGE_EMA_ALPHA,
            edge_min_tests: EDGE_MIN_TESTS,
        }
    }
}

/// Epistemic debt limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebtPolicy {
    /// Debt at or above which non-calibration actions are blocked.
    pub hard_block_bits: f64,
    /// Refusals in a row that end the run.
    pub max_consecutive_refusals: u64,
}

impl Default for DebtPolicy {
    fn default() -> Self {
        Self {
            hard_block_bits: DEBT_HARD_BLOCK_BITS,
            max_consecutive_refusals: MAX_CONSECUTIVE_REFUSALS,
        }
    }
}
