use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::gate::{GateState, GateStatus};

/// Pooled vehicle-control noise on the primary readout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseAxis {
    pub sse: f64,
    pub df: u64,
    pub sigma: Option<f64>,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
    pub rel_width: Option<f64>,
    pub drift: Option<f64>,
    /// Per-cycle batch sigmas, oldest first, bounded.
    pub history: Vec<f64>,
    pub streak: u32,
    pub state: GateState,
    pub stable: bool,
}

impl NoiseAxis {
    pub fn status(&self) -> GateStatus {
        GateStatus {
            state: self.state,
            streak: self.streak,
        }
    }
}

/// Pooled vehicle-control noise for one secondary assay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssayAxisState {
    pub sse: f64,
    pub df: u64,
    pub rel_width: Option<f64>,
    /// Totals from directly measured (non-proxy) summaries only.
    pub measured_sse: f64,
    pub measured_df: u64,
    pub measured_rel_width: Option<f64>,
    pub state: GateState,
    pub stable: bool,
}

/// Edge-versus-center effect, smoothed per channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeEffectAxis {
    pub ema: BTreeMap<String, f64>,
    pub tests: u64,
    pub confident: bool,
}

/// Whether response structure has been observed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseAxes {
    pub dose_curvature_seen: bool,
    pub time_dependence_seen: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationLog {
    pub tested_compounds: BTreeSet<String>,
    pub tested_cell_lines: BTreeSet<String>,
    /// Condition summaries ingested so far.
    pub n_observations: u64,
    /// Vehicle-control wells per position name.
    pub calibration_wells: BTreeMap<String, u64>,
}

impl ExplorationLog {
    pub fn calibration_wells_at(&self, position: &str) -> u64 {
        self.calibration_wells.get(position).copied().unwrap_or(0)
    }

    pub fn calibration_wells_total(&self) -> u64 {
        self.calibration_wells.values().sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InsolvencyAxis {
    pub debt_bits: f64,
    pub consecutive_refusals: u64,
    pub last_refusal_reason: Option<String>,
    pub insolvent: bool,
}
