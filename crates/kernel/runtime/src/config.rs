use std::path::Path;

use assaypilot_belief::{DebtPolicy, GatePolicy};
use assaypilot_chooser::ChooserConfig;
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// Bits repaid by one calibration-only cycle.
pub const DEFAULT_DEBT_REPAYMENT_BITS: f64 = 0.5;

/// Run configuration.
///
/// Every section defaults to the fixed policy constants, so a partial JSON
/// file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub gate: GatePolicy,
    pub debt: DebtPolicy,
    pub chooser: ChooserConfig,
    /// Lets the chooser pick templates that need explicit authorization.
    pub allow_expensive_calibration: bool,
    pub debt_repayment_bits: f64,
    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gate: GatePolicy::default(),
            debt: DebtPolicy::default(),
            chooser: ChooserConfig::default(),
            allow_expensive_calibration: false,
            debt_repayment_bits: DEFAULT_DEBT_REPAYMENT_BITS,
            log_level: "info".to_string(),
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        let gate = &self.gate;
        if !(gate.enter_rel_width > 0.0 && gate.enter_rel_width < gate.exit_rel_width) {
            return Err(RuntimeError::Config(format!(
                "gate thresholds need 0 < enter ({}) < exit ({})",
                gate.enter_rel_width, gate.exit_rel_width
            )));
        }
        if !(gate.drift_threshold > 0.0) {
            return Err(RuntimeError::Config("drift threshold must be positive".into()));
        }
        if gate.streak_required == 0 || gate.drift_window == 0 {
            return Err(RuntimeError::Config(
                "streak and drift window must be at least 1".into(),
            ));
        }
        if gate.history_len < 2 * gate.drift_window {
            return Err(RuntimeError::Config(format!(
                "sigma history ({}) shorter than two drift windows ({})",
                gate.history_len,
                2 * gate.drift_window
            )));
        }
        if !(gate.edge_ema_alpha > 0.0 && gate.edge_ema_alpha <= 1.0) {
            return Err(RuntimeError::Config("edge EMA alpha must be in (0, 1]".into()));
        }
        if !(self.debt.hard_block_bits > 0.0) || self.debt.max_consecutive_refusals == 0 {
            return Err(RuntimeError::Config("debt limits must be positive".into()));
        }
        if !(self.debt_repayment_bits.is_finite() && self.debt_repayment_bits >= 0.0) {
            return Err(RuntimeError::Config(format!(
                "debt repayment must be a non-negative number of bits, got {}",
                self.debt_repayment_bits
            )));
        }
        let chooser = &self.chooser;
        if chooser.cycle0_wells == 0 || chooser.min_batch_wells == 0 || chooser.replicates == 0 {
            return Err(RuntimeError::Config(
                "cycle 0 size, minimum batch and replicates must be positive".into(),
            ));
        }
        if chooser.cell_lines.is_empty()
            || chooser.dose_ladder_um.is_empty()
            || chooser.timepoints_h.is_empty()
        {
            return Err(RuntimeError::Config(
                "cell lines, dose ladder and timepoints must not be empty".into(),
            ));
        }
        Ok(())
    }
}
