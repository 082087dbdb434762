use std::fmt;

use assaypilot_ledger::FieldValue;

use crate::gate::{AssayAxis, GateState};

/// Per-assay field of an assay calibration axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssayField {
    Sse,
    Df,
    RelWidth,
    /// Totals from directly measured (non-proxy) summaries.
    MeasuredSse,
    MeasuredDf,
    MeasuredRelWidth,
    GateState,
    Stable,
}

impl AssayField {
    pub const ALL: [AssayField; 8] = [
        AssayField::Sse,
        AssayField::Df,
        AssayField::RelWidth,
        AssayField::MeasuredSse,
        AssayField::MeasuredDf,
        AssayField::MeasuredRelWidth,
        AssayField::GateState,
        AssayField::Stable,
    ];
}

/// Every field of the belief state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BeliefField {
    NoiseSse,
    NoiseDf,
    NoiseSigma,
    NoiseCiLow,
    NoiseCiHigh,
    NoiseRelWidth,
    NoiseDrift,
    NoiseHistory,
    NoiseStreak,
    NoiseGateState,
    NoiseStable,
    Assay(AssayAxis, AssayField),
    EdgeEffectEma,
    EdgeTests,
    EdgeConfident,
    DoseCurvatureSeen,
    TimeDependenceSeen,
    TestedCompounds,
    TestedCellLines,
    ObservationCount,
    CalibrationWells,
    DebtBits,
    ConsecutiveRefusals,
    LastRefusalReason,
    Insolvent,
}

impl BeliefField {
    /// Every field, noise axis first.
    pub fn all() -> Vec<BeliefField> {
        let mut fields = vec![
            BeliefField::NoiseSse,
            BeliefField::NoiseDf,
            BeliefField::NoiseSigma,
            BeliefField::NoiseCiLow,
            BeliefField::NoiseCiHigh,
            BeliefField::NoiseRelWidth,
            BeliefField::NoiseDrift,
            BeliefField::NoiseHistory,
            BeliefField::NoiseStreak,
            BeliefField::NoiseGateState,
            BeliefField::NoiseStable,
        ];
        for axis in AssayAxis::LADDER {
            fields.extend(AssayField::ALL.iter().map(|f| BeliefField::Assay(axis, *f)));
        }
        fields.extend([
            BeliefField::EdgeEffectEma,
            BeliefField::EdgeTests,
            BeliefField::EdgeConfident,
            BeliefField::DoseCurvatureSeen,
            BeliefField::TimeDependenceSeen,
            BeliefField::TestedCompounds,
            BeliefField::TestedCellLines,
            BeliefField::ObservationCount,
            BeliefField::CalibrationWells,
            BeliefField::DebtBits,
            BeliefField::ConsecutiveRefusals,
            BeliefField::LastRefusalReason,
            BeliefField::Insolvent,
        ]);
        fields
    }

    pub fn name(&self) -> &'static str {
        use AssayAxis as A;
        use AssayField as F;
        match self {
            BeliefField::NoiseSse => "noise_sse",
            BeliefField::NoiseDf => "noise_df",
            BeliefField::NoiseSigma => "noise_sigma_hat",
            BeliefField::NoiseCiLow => "noise_ci_low",
            BeliefField::NoiseCiHigh => "noise_ci_high",
            BeliefField::NoiseRelWidth => "noise_rel_width",
            BeliefField::NoiseDrift => "noise_drift_metric",
            BeliefField::NoiseHistory => "noise_sigma_history",
            BeliefField::NoiseStreak => "noise_gate_streak",
            BeliefField::NoiseGateState => "noise_gate_state",
            BeliefField::NoiseStable => "noise_sigma_stable",
            BeliefField::Assay(A::Ldh, F::Sse) => "ldh_sse",
            BeliefField::Assay(A::Ldh, F::Df) => "ldh_df",
            BeliefField::Assay(A::Ldh, F::MeasuredSse) => "ldh_measured_sse",
            BeliefField::Assay(A::Ldh, F::MeasuredDf) => "ldh_measured_df",
            BeliefField::Assay(A::Ldh, F::MeasuredRelWidth) => "ldh_measured_rel_width",
            BeliefField::Assay(A::Ldh, F::RelWidth) => "ldh_rel_width",
            BeliefField::Assay(A::Ldh, F::GateState) => "ldh_gate_state",
            BeliefField::Assay(A::Ldh, F::Stable) => "ldh_sigma_stable",
            BeliefField::Assay(A::CellPaint, F::Sse) => "cell_paint_sse",
            BeliefField::Assay(A::CellPaint, F::Df) => "cell_paint_df",
            BeliefField::Assay(A::CellPaint, F::MeasuredSse) => "cell_paint_measured_sse",
            BeliefField::Assay(A::CellPaint, F::MeasuredDf) => "cell_paint_measured_df",
            BeliefField::Assay(A::CellPaint, F::MeasuredRelWidth) => "cell_paint_measured_rel_width",
            BeliefField::Assay(A::CellPaint, F::RelWidth) => "cell_paint_rel_width",
            BeliefField::Assay(A::CellPaint, F::GateState) => "cell_paint_gate_state",
            BeliefField::Assay(A::CellPaint, F::Stable) => "cell_paint_sigma_stable",
            BeliefField::Assay(A::Scrna, F::Sse) => "scrna_sse",
            BeliefField::Assay(A::Scrna, F::Df) => "scrna_df",
            BeliefField::Assay(A::Scrna, F::MeasuredSse) => "scrna_measured_sse",
            BeliefField::Assay(A::Scrna, F::MeasuredDf) => "scrna_measured_df",
            BeliefField::Assay(A::Scrna, F::MeasuredRelWidth) => "scrna_measured_rel_width",
            BeliefField::Assay(A::Scrna, F::RelWidth) => "scrna_rel_width",
            BeliefField::Assay(A::Scrna, F::GateState) => "scrna_gate_state",
            BeliefField::Assay(A::Scrna, F::Stable) => "scrna_sigma_stable",
            BeliefField::EdgeEffectEma => "edge_effect_ema",
            BeliefField::EdgeTests => "edge_tests_run",
            BeliefField::EdgeConfident => "edge_effect_confident",
            BeliefField::DoseCurvatureSeen => "dose_curvature_seen",
            BeliefField::TimeDependenceSeen => "time_dependence_seen",
            BeliefField::TestedCompounds => "tested_compounds",
            BeliefField::TestedCellLines => "tested_cell_lines",
            BeliefField::ObservationCount => "n_observations",
            BeliefField::CalibrationWells => "calibration_wells_by_position",
            BeliefField::DebtBits => "epistemic_debt_bits",
            BeliefField::ConsecutiveRefusals => "consecutive_refusals",
            BeliefField::LastRefusalReason => "last_refusal_reason",
            BeliefField::Insolvent => "insolvent",
        }
    }

    /// Gate-type fields only change with a gate marker.
    pub fn is_gate(&self) -> bool {
        matches!(
            self,
            BeliefField::NoiseGateState
                | BeliefField::NoiseStable
                | BeliefField::EdgeConfident
                | BeliefField::Assay(_, AssayField::GateState | AssayField::Stable)
        )
    }

    /// Value type the field holds.
    pub fn expected_kind(&self) -> &'static str {
        match self {
            BeliefField::NoiseSse
            | BeliefField::DebtBits
            | BeliefField::Assay(_, AssayField::Sse | AssayField::MeasuredSse) => "real",
            BeliefField::NoiseSigma
            | BeliefField::NoiseCiLow
            | BeliefField::NoiseCiHigh
            | BeliefField::NoiseRelWidth
            | BeliefField::NoiseDrift
            | BeliefField::Assay(_, AssayField::RelWidth | AssayField::MeasuredRelWidth) => {
                "real or null"
            }
            BeliefField::NoiseDf
            | BeliefField::NoiseStreak
            | BeliefField::EdgeTests
            | BeliefField::ObservationCount
            | BeliefField::ConsecutiveRefusals
            | BeliefField::Assay(_, AssayField::Df | AssayField::MeasuredDf) => "count",
            BeliefField::NoiseGateState | BeliefField::Assay(_, AssayField::GateState) => {
                "gate state text"
            }
            BeliefField::NoiseStable
            | BeliefField::EdgeConfident
            | BeliefField::DoseCurvatureSeen
            | BeliefField::TimeDependenceSeen
            | BeliefField::Insolvent
            | BeliefField::Assay(_, AssayField::Stable) => "bool",
            BeliefField::NoiseHistory => "series",
            BeliefField::EdgeEffectEma | BeliefField::CalibrationWells => "map",
            BeliefField::TestedCompounds | BeliefField::TestedCellLines => "set",
            BeliefField::LastRefusalReason => "text or null",
        }
    }

    /// Whether `value` has the type this field holds.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self.expected_kind(), value) {
            ("real", FieldValue::Real(_)) => true,
            ("real or null", FieldValue::Real(_) | FieldValue::Null) => true,
            ("count", FieldValue::Count(_)) => true,
            ("gate state text", FieldValue::Text(s)) => GateState::parse(s).is_some(),
            ("bool", FieldValue::Bool(_)) => true,
            ("series", FieldValue::Series(_)) => true,
            ("map", FieldValue::Map(_)) => true,
            ("set", FieldValue::Set(_)) => true,
            ("text or null", FieldValue::Text(_) | FieldValue::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BeliefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
