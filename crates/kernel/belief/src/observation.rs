use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Compound name of the vehicle control.
pub const VEHICLE: &str = "DMSO";

/// Readout a condition summary was measured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssayKind {
    /// Primary scalar readout; vehicle controls feed the noise axis.
    Viability,
    /// Scalar cytotoxicity readout.
    Ldh,
    /// High-dimensional morphology readout.
    CellPainting,
    /// Transcriptomic readout, the expensive one.
    Scrna,
}

impl AssayKind {
    pub fn name(&self) -> &'static str {
        match self {
            AssayKind::Viability => "viability",
            AssayKind::Ldh => "ldh",
            AssayKind::CellPainting => "cell_paint",
            AssayKind::Scrna => "scrna",
        }
    }
}

/// Spatial position tag of the wells behind a summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Center,
    Edge,
}

impl Position {
    pub const ALL: [Position; 2] = [Position::Center, Position::Edge];

    pub fn name(&self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::Edge => "edge",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One aggregated observation, produced outside the kernel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub cell_line: String,
    pub compound: String,
    pub dose_um: f64,
    pub time_h: f64,
    pub assay: AssayKind,
    pub position: Position,
    pub n_wells: u32,
    pub mean: f64,
    pub std: f64,
    pub cv: f64,
    #[serde(default)]
    pub channel_means: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub channel_stds: Option<BTreeMap<String, f64>>,
    /// Readout derived from another assay rather than measured directly.
    #[serde(default)]
    pub proxy: bool,
}

impl ConditionSummary {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cell_line: impl Into<String>,
        compound: impl Into<String>,
        dose_um: f64,
        time_h: f64,
        assay: AssayKind,
        position: Position,
        n_wells: u32,
        mean: f64,
        std: f64,
    ) -> Self {
        let cv = if mean.abs() > f64::EPSILON {
            std / mean.abs()
        } else {
            0.0
        };
        Self {
            cell_line: cell_line.into(),
            compound: compound.into(),
            dose_um,
            time_h,
            assay,
            position,
            n_wells,
            mean,
            std,
            cv,
            channel_means: None,
            channel_stds: None,
            proxy: false,
        }
    }

    /// Attach per-channel means and standard deviations.
    pub fn with_channels(
        mut self,
        means: BTreeMap<String, f64>,
        stds: BTreeMap<String, f64>,
    ) -> Self {
        self.channel_means = Some(means);
        self.channel_stds = Some(stds);
        self
    }

    /// Mark the readout as proxy evidence.
    pub fn as_proxy(mut self) -> Self {
        self.proxy = true;
        self
    }

    pub fn is_vehicle(&self) -> bool {
        self.compound.eq_ignore_ascii_case(VEHICLE)
    }

    /// Stable key used to cite this condition as supporting evidence.
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.cell_line,
            self.compound,
            self.dose_um,
            self.time_h,
            self.assay.name(),
            self.position.name()
        )
    }

    /// Replicate degrees of freedom, `n − 1` (zero below two wells).
    pub fn replicate_df(&self) -> u64 {
        u64::from(self.n_wells.saturating_sub(1))
    }

    /// Replicate variance. Morphology summaries with channel stds use the mean
    /// of the per-channel variances.
    pub fn replicate_variance(&self) -> f64 {
        if self.assay == AssayKind::CellPainting {
            if let Some(stds) = self.channel_stds.as_ref().filter(|s| !s.is_empty()) {
                return stds.values().map(|s| s * s).sum::<f64>() / stds.len() as f64;
            }
        }
        self.std * self.std
    }

    /// Replicate sum of squared errors, `(n − 1) · variance`.
    pub fn replicate_sse(&self) -> f64 {
        self.replicate_df() as f64 * self.replicate_variance()
    }

    /// `(channel, mean, std)` triples; a single `primary` channel when the
    /// summary carries no per-channel data.
    pub fn channels(&self) -> Vec<(String, f64, f64)> {
        match (&self.channel_means, &self.channel_stds) {
            (Some(means), Some(stds)) if !means.is_empty() => means
                .iter()
                .filter_map(|(ch, m)| stds.get(ch).map(|s| (ch.clone(), *m, *s)))
                .collect(),
            _ => vec![("primary".to_string(), self.mean, self.std)],
        }
    }

    /// First problem with the summary's numbers, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_wells == 0 {
            return Err(format!("{}: zero wells", self.key()));
        }
        if !self.mean.is_finite() || !self.std.is_finite() || self.std < 0.0 {
            return Err(format!(
                "{}: mean {} / std {} not usable",
                self.key(),
                self.mean,
                self.std
            ));
        }
        if !(self.dose_um >= 0.0) || !(self.time_h >= 0.0) {
            return Err(format!(
                "{}: dose {} / time {} must be non-negative",
                self.key(),
                self.dose_um,
                self.time_h
            ));
        }
        Ok(())
    }
}

/// A batch of condition summaries delivered for one cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub cycle: u64,
    pub conditions: Vec<ConditionSummary>,
    /// When the observation was taken, in hours of assay time. Defaults to
    /// the latest condition timepoint.
    #[serde(default)]
    pub evidence_time_h: Option<f64>,
}

impl Observation {
    pub fn new(cycle: u64, conditions: Vec<ConditionSummary>) -> Self {
        Self {
            cycle,
            conditions,
            evidence_time_h: None,
        }
    }

    pub fn empty(cycle: u64) -> Self {
        Self::new(cycle, Vec::new())
    }

    pub fn with_evidence_time(mut self, evidence_time_h: f64) -> Self {
        self.evidence_time_h = Some(evidence_time_h);
        self
    }

    /// Explicit evidence time, else the latest condition timepoint.
    pub fn evidence_time(&self) -> Option<f64> {
        self.evidence_time_h.or_else(|| {
            self.conditions
                .iter()
                .map(|c| c.time_h)
                .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))))
        })
    }

    /// Non-empty and made only of vehicle controls.
    pub fn is_calibration_only(&self) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.is_vehicle())
    }

    pub fn total_wells(&self) -> u64 {
        self.conditions.iter().map(|c| u64::from(c.n_wells)).sum()
    }
}
