use std::collections::BTreeMap;

use assaypilot_belief::{AssayKind, ConditionSummary, Observation, Position, VEHICLE};
use assaypilot_chooser::{ActionClass, Decision, Template};
use serde_json::Value;

use crate::fixtures::{CELL_LINE, TIME_H};

const PAINT_CHANNELS: [&str; 3] = ["dna", "er", "mito"];

/// Deterministic stand-in for the lab.
///
/// Vehicle wells read 1.0 with standard deviation `std`, shrinking by
/// `std_step` per cycle. Treated wells follow a dose- and time-dependent
/// viability curve.
#[derive(Clone, Debug)]
pub struct PlateSimulator {
    pub std: f64,
    pub std_step: f64,
    /// Assay time of the observation, in hours.
    pub evidence_time_h: f64,
}

impl Default for PlateSimulator {
    fn default() -> Self {
        Self {
            std: 0.1,
            std_step: 0.0,
            evidence_time_h: 48.0,
        }
    }
}

fn calibration_assay(template: Template) -> Option<AssayKind> {
    match template {
        Template::Cycle0FullPlate | Template::BaselineReplicates | Template::EdgeCenterTest => {
            Some(AssayKind::Viability)
        }
        Template::CalibrateLdhBaseline => Some(AssayKind::Ldh),
        Template::CalibrateCellPaintBaseline => Some(AssayKind::CellPainting),
        Template::CalibrateScrnaBaseline => Some(AssayKind::Scrna),
        _ => None,
    }
}

fn numbers(value: &Value, key: &str) -> Vec<f64> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

/// Split `wells` across `positions`, remainder to the first.
fn split(wells: u32, positions: &[Position]) -> Vec<(Position, u32)> {
    let n = u32::try_from(positions.len()).unwrap_or(1).max(1);
    positions
        .iter()
        .enumerate()
        .map(|(i, &p)| (p, wells / n + if i == 0 { wells % n } else { 0 }))
        .filter(|(_, w)| *w > 0)
        .collect()
}

impl PlateSimulator {
    fn std_at(&self, cycle: u64) -> f64 {
        (self.std - self.std_step * cycle as f64).max(1e-6)
    }

    fn viability(dose_um: f64, time_h: f64) -> f64 {
        1.0 / (1.0 + (dose_um / 10.0) * (time_h / 24.0))
    }

    /// What executing `decision` would produce, delivered at `cycle`.
    ///
    /// `None` for decisions that run nothing.
    pub fn observe(&self, decision: &Decision, cycle: u64) -> Option<Observation> {
        let template = decision.template?;
        let std = self.std_at(cycle);
        let conditions = match template.class() {
            ActionClass::Calibration => {
                let assay = calibration_assay(template)?;
                split(decision.wells_requested, template.positions())
                    .into_iter()
                    .map(|(position, n)| self.vehicle(assay, position, n, std))
                    .collect()
            }
            ActionClass::Biology => self.treated(decision, template, std),
            ActionClass::Proposal | ActionClass::Terminal => return None,
        };
        Some(Observation::new(cycle, conditions).with_evidence_time(self.evidence_time_h))
    }

    fn vehicle(&self, assay: AssayKind, position: Position, n: u32, std: f64) -> ConditionSummary {
        let summary =
            ConditionSummary::new(CELL_LINE, VEHICLE, 0.0, TIME_H, assay, position, n, 1.0, std);
        if assay == AssayKind::CellPainting {
            let means: BTreeMap<String, f64> =
                PAINT_CHANNELS.iter().map(|c| (c.to_string(), 1.0)).collect();
            let stds: BTreeMap<String, f64> =
                PAINT_CHANNELS.iter().map(|c| (c.to_string(), std)).collect();
            summary.with_channels(means, stds)
        } else {
            summary
        }
    }

    fn treated(&self, decision: &Decision, template: Template, std: f64) -> Vec<ConditionSummary> {
        let params = &decision.parameters;
        let compound = params
            .get("compound")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let cell_line = params
            .get("cell_line")
            .and_then(Value::as_str)
            .unwrap_or(CELL_LINE)
            .to_string();
        let replicates = params
            .get("replicates")
            .and_then(Value::as_u64)
            .and_then(|r| u32::try_from(r).ok())
            .unwrap_or(3);

        let mut out = Vec::new();
        for dose in numbers(params, "doses_um") {
            for time in numbers(params, "timepoints_h") {
                for &position in template.positions() {
                    out.push(ConditionSummary::new(
                        cell_line.clone(),
                        compound.clone(),
                        dose,
                        time,
                        AssayKind::Viability,
                        position,
                        replicates,
                        Self::viability(dose, time),
                        std,
                    ));
                }
            }
        }
        out
    }
}
