use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-cycle decision event.
///
/// A flattened view of a decision and its receipt, built by the chooser and
/// recorded exactly once per cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub cycle: u64,
    pub decision_id: String,
    pub kind: String,
    pub template: Option<String>,
    pub receipt_template: String,
    pub forced: bool,
    pub trigger: String,
    pub regime: String,
    pub enforcement_layer: Option<String>,
    pub gate_state: BTreeMap<String, String>,
    pub wells_requested: u32,
    pub summary: String,
    pub fingerprint: String,
    pub recorded_at: String,
}

/// Per-cycle noise diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseDiagnostics {
    pub cycle: u64,
    /// Vehicle-control conditions that fed the noise axis this cycle.
    pub conditions_used: u32,
    pub df_delta: u64,
    pub df_total: u64,
    pub batch_sigma: Option<f64>,
    pub sigma_hat: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
    pub rel_width: Option<f64>,
    pub drift_metric: Option<f64>,
    pub streak: u32,
    pub gate_state: String,
    pub stable: bool,
}
