use std::collections::BTreeMap;

use assaypilot_ledger::{
    breach, Covenant, CovenantViolation, EvidenceEvent, EvidenceLedger, FieldValue, GateMarker,
};
use tracing::{debug, warn};

use crate::axes::{
    AssayAxisState, EdgeEffectAxis, ExplorationLog, InsolvencyAxis, NoiseAxis, ResponseAxes,
};
use crate::error::BeliefError;
use crate::field::{AssayField, BeliefField};
use crate::gate::{AssayAxis, GateAxis, GateState};
use crate::policy::{DebtPolicy, GatePolicy};

/// Evidence behind a belief change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Support {
    pub evidence: BTreeMap<String, f64>,
    pub conditions: Vec<String>,
    pub note: Option<String>,
}

impl Support {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a numeric piece of evidence. Non-finite values are dropped.
    pub fn metric(mut self, key: &str, value: f64) -> Self {
        if value.is_finite() {
            self.evidence.insert(key.to_string(), value);
        }
        self
    }

    pub fn maybe_metric(self, key: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.metric(key, v),
            None => self,
        }
    }

    pub fn conditions<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.conditions.extend(keys);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn marker(&self) -> Option<GateMarker> {
        self.note.as_deref().and_then(GateMarker::parse)
    }
}

/// Timing of a belief change, in hours of assay time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EvidenceTimes {
    pub evidence_time_h: Option<f64>,
    /// Timepoint the belief is about; `None` for atemporal beliefs.
    pub claim_time_h: Option<f64>,
}

impl EvidenceTimes {
    pub fn atemporal(evidence_time_h: Option<f64>) -> Self {
        Self {
            evidence_time_h,
            claim_time_h: None,
        }
    }

    pub fn claim(claim_time_h: f64, evidence_time_h: Option<f64>) -> Self {
        Self {
            evidence_time_h,
            claim_time_h: Some(claim_time_h),
        }
    }

    /// A claim about `t_claim` needs evidence from `t_evidence >= t_claim`.
    pub fn check(&self, field: BeliefField) -> Result<(), BeliefError> {
        let Some(claim_time_h) = self.claim_time_h else {
            return Ok(());
        };
        match self.evidence_time_h {
            None => Err(BeliefError::MissingEvidenceTime {
                field: field.name().to_string(),
                claim_time_h,
            }),
            Some(evidence_time_h) if claim_time_h > evidence_time_h => {
                Err(BeliefError::TemporalCausality {
                    field: field.name().to_string(),
                    claim_time_h,
                    evidence_time_h,
                })
            }
            Some(_) => Ok(()),
        }
    }
}

/// The belief state.
///
/// Fields are private; every change goes through [`BeliefState::set`], which
/// records one evidence event per change. Reads go through the axis
/// accessors.
#[derive(Clone, Debug, Default)]
pub struct BeliefState {
    policy: GatePolicy,
    debt_policy: DebtPolicy,
    pub(crate) noise: NoiseAxis,
    pub(crate) ldh: AssayAxisState,
    pub(crate) cell_paint: AssayAxisState,
    pub(crate) scrna: AssayAxisState,
    pub(crate) edge: EdgeEffectAxis,
    pub(crate) response: ResponseAxes,
    pub(crate) exploration: ExplorationLog,
    pub(crate) insolvency: InsolvencyAxis,
    ledger: EvidenceLedger,
}

impl BeliefState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: GatePolicy, debt_policy: DebtPolicy) -> Self {
        Self {
            policy,
            debt_policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    pub fn debt_policy(&self) -> &DebtPolicy {
        &self.debt_policy
    }

    /// Cycle the evidence ledger is in.
    pub fn cycle(&self) -> u64 {
        self.ledger.cycle()
    }

    /// Move to `cycle`. Cycles never regress.
    pub fn enter_cycle(&mut self, cycle: u64) -> Result<(), BeliefError> {
        self.ledger.begin_cycle(cycle)?;
        Ok(())
    }

    pub fn noise(&self) -> &NoiseAxis {
        &self.noise
    }

    pub fn assay(&self, axis: AssayAxis) -> &AssayAxisState {
        match axis {
            AssayAxis::Ldh => &self.ldh,
            AssayAxis::CellPaint => &self.cell_paint,
            AssayAxis::Scrna => &self.scrna,
        }
    }

    fn assay_mut(&mut self, axis: AssayAxis) -> &mut AssayAxisState {
        match axis {
            AssayAxis::Ldh => &mut self.ldh,
            AssayAxis::CellPaint => &mut self.cell_paint,
            AssayAxis::Scrna => &mut self.scrna,
        }
    }

    pub fn edge(&self) -> &EdgeEffectAxis {
        &self.edge
    }

    pub fn response(&self) -> &ResponseAxes {
        &self.response
    }

    pub fn exploration(&self) -> &ExplorationLog {
        &self.exploration
    }

    pub fn insolvency(&self) -> &InsolvencyAxis {
        &self.insolvency
    }

    pub fn gate_state(&self, axis: GateAxis) -> GateState {
        match axis.assay_axis() {
            None => self.noise.state,
            Some(assay) => self.assay(assay).state,
        }
    }

    pub fn is_earned(&self, axis: GateAxis) -> bool {
        self.gate_state(axis).is_earned()
    }

    /// Gate states by name, for receipts.
    pub fn gate_snapshot(&self) -> BTreeMap<String, String> {
        let mut snapshot: BTreeMap<String, String> = GateAxis::ALL
            .iter()
            .map(|axis| (axis.name().to_string(), self.gate_state(*axis).name().to_string()))
            .collect();
        let edge = if self.edge.confident {
            GateState::Earned
        } else {
            GateState::Undetermined
        };
        snapshot.insert("edge_effect".to_string(), edge.name().to_string());
        snapshot
    }

    /// Events recorded since the last drain.
    pub fn pending_events(&self) -> &[EvidenceEvent] {
        self.ledger.pending()
    }

    pub fn drain_events(&mut self) -> Vec<EvidenceEvent> {
        self.ledger.drain()
    }

    /// Current value of a field.
    pub fn read(&self, field: BeliefField) -> FieldValue {
        match field {
            BeliefField::NoiseSse => FieldValue::Real(self.noise.sse),
            BeliefField::NoiseDf => FieldValue::Count(self.noise.df),
            BeliefField::NoiseSigma => FieldValue::maybe_real(self.noise.sigma),
            BeliefField::NoiseCiLow => FieldValue::maybe_real(self.noise.ci_low),
            BeliefField::NoiseCiHigh => FieldValue::maybe_real(self.noise.ci_high),
            BeliefField::NoiseRelWidth => FieldValue::maybe_real(self.noise.rel_width),
            BeliefField::NoiseDrift => FieldValue::maybe_real(self.noise.drift),
            BeliefField::NoiseHistory => FieldValue::Series(self.noise.history.clone()),
            BeliefField::NoiseStreak => FieldValue::Count(u64::from(self.noise.streak)),
            BeliefField::NoiseGateState => FieldValue::Text(self.noise.state.name().to_string()),
            BeliefField::NoiseStable => FieldValue::Bool(self.noise.stable),
            BeliefField::Assay(axis, f) => {
                let a = self.assay(axis);
                match f {
                    AssayField::Sse => FieldValue::Real(a.sse),
                    AssayField::Df => FieldValue::Count(a.df),
                    AssayField::RelWidth => FieldValue::maybe_real(a.rel_width),
                    AssayField::MeasuredSse => FieldValue::Real(a.measured_sse),
                    AssayField::MeasuredDf => FieldValue::Count(a.measured_df),
                    AssayField::MeasuredRelWidth => FieldValue::maybe_real(a.measured_rel_width),
                    AssayField::GateState => FieldValue::Text(a.state.name().to_string()),
                    AssayField::Stable => FieldValue::Bool(a.stable),
                }
            }
            BeliefField::EdgeEffectEma => FieldValue::Map(self.edge.ema.clone()),
            BeliefField::EdgeTests => FieldValue::Count(self.edge.tests),
            BeliefField::EdgeConfident => FieldValue::Bool(self.edge.confident),
            BeliefField::DoseCurvatureSeen => FieldValue::Bool(self.response.dose_curvature_seen),
            BeliefField::TimeDependenceSeen => {
                FieldValue::Bool(self.response.time_dependence_seen)
            }
            BeliefField::TestedCompounds => {
                FieldValue::Set(self.exploration.tested_compounds.clone())
            }
            BeliefField::TestedCellLines => {
                FieldValue::Set(self.exploration.tested_cell_lines.clone())
            }
            BeliefField::ObservationCount => FieldValue::Count(self.exploration.n_observations),
            BeliefField::CalibrationWells => FieldValue::Map(
                self.exploration
                    .calibration_wells
                    .iter()
                    .map(|(k, v)| (k.clone(), *v as f64))
                    .collect(),
            ),
            BeliefField::DebtBits => FieldValue::Real(self.insolvency.debt_bits),
            BeliefField::ConsecutiveRefusals => {
                FieldValue::Count(self.insolvency.consecutive_refusals)
            }
            BeliefField::LastRefusalReason => {
                FieldValue::maybe_text(self.insolvency.last_refusal_reason.clone())
            }
            BeliefField::Insolvent => FieldValue::Bool(self.insolvency.insolvent),
        }
    }

    /// The single accountable setter.
    ///
    /// Checks temporal causality before anything else; a violation leaves the
    /// state untouched. Returns `Ok(false)` when `value` equals the current
    /// value (no event). Changing a gate-type field without a
    /// `gate_event:`/`gate_loss:` marker is a covenant breach.
    pub fn set(
        &mut self,
        field: BeliefField,
        value: FieldValue,
        support: Support,
        times: EvidenceTimes,
    ) -> Result<bool, BeliefError> {
        times.check(field)?;

        let prev = self.read(field);
        if prev == value {
            return Ok(false);
        }
        if !field.accepts(&value) {
            return Err(type_mismatch(field, &value));
        }
        if field.is_gate() && !matches!(support.marker(), Some(GateMarker::Event | GateMarker::Loss))
        {
            breach(CovenantViolation::new(
                Covenant::GateMarkerRequired,
                format!("{field} changed from {prev} to {value} without a gate marker"),
            ));
        }

        self.write(field, &value)?;
        debug!(field = field.name(), %prev, new = %value, "Belief updated");
        self.ledger.append(EvidenceEvent {
            cycle: self.ledger.cycle(),
            belief: field.name().to_string(),
            prev,
            new: value,
            evidence: support.evidence,
            supporting_conditions: support.conditions,
            note: support.note,
            evidence_time_h: times.evidence_time_h,
            claim_time_h: times.claim_time_h,
        })?;
        Ok(true)
    }

    /// Record a near-earn that the evidence does not admit. The field keeps
    /// its value.
    pub fn record_shadow(
        &mut self,
        field: BeliefField,
        axis: GateAxis,
        support: Support,
        times: EvidenceTimes,
    ) -> Result<(), BeliefError> {
        times.check(field)?;
        let current = self.read(field);
        warn!(field = field.name(), axis = axis.name(), "Gate shadow: evidence not admissible");
        self.ledger.append(EvidenceEvent {
            cycle: self.ledger.cycle(),
            belief: field.name().to_string(),
            prev: current.clone(),
            new: current,
            evidence: support.evidence,
            supporting_conditions: support.conditions,
            note: Some(GateMarker::Shadow.note(axis.name())),
            evidence_time_h: times.evidence_time_h,
            claim_time_h: times.claim_time_h,
        })?;
        Ok(())
    }

    /// Move a gate to `state`, marking both its state and stable fields.
    pub(crate) fn apply_gate_state(
        &mut self,
        axis: GateAxis,
        state: GateState,
        support: Support,
        times: EvidenceTimes,
    ) -> Result<(), BeliefError> {
        let marker = if state.is_earned() {
            GateMarker::Event
        } else {
            GateMarker::Loss
        };
        let support = support.note(marker.note(axis.name()));
        let (state_field, stable_field) = match axis.assay_axis() {
            None => (BeliefField::NoiseGateState, BeliefField::NoiseStable),
            Some(a) => (
                BeliefField::Assay(a, AssayField::GateState),
                BeliefField::Assay(a, AssayField::Stable),
            ),
        };
        self.set(
            state_field,
            FieldValue::Text(state.name().to_string()),
            support.clone(),
            times,
        )?;
        self.set(stable_field, FieldValue::Bool(state.is_earned()), support, times)?;
        Ok(())
    }

    fn write(&mut self, field: BeliefField, value: &FieldValue) -> Result<(), BeliefError> {
        let real = value.as_real();
        let count = value.as_count().unwrap_or(0);
        let flag = value.as_bool().unwrap_or(false);
        let gate = || match value {
            FieldValue::Text(s) => GateState::parse(s).ok_or_else(|| type_mismatch(field, value)),
            _ => Err(type_mismatch(field, value)),
        };
        match field {
            BeliefField::NoiseSse => self.noise.sse = real.unwrap_or(0.0),
            BeliefField::NoiseDf => self.noise.df = count,
            BeliefField::NoiseSigma => self.noise.sigma = real,
            BeliefField::NoiseCiLow => self.noise.ci_low = real,
            BeliefField::NoiseCiHigh => self.noise.ci_high = real,
            BeliefField::NoiseRelWidth => self.noise.rel_width = real,
            BeliefField::NoiseDrift => self.noise.drift = real,
            BeliefField::NoiseHistory => {
                if let FieldValue::Series(v) = value {
                    self.noise.history = v.clone();
                }
            }
            BeliefField::NoiseStreak => {
                self.noise.streak = u32::try_from(count).unwrap_or(u32::MAX)
            }
            BeliefField::NoiseGateState => self.noise.state = gate()?,
            BeliefField::NoiseStable => self.noise.stable = flag,
            BeliefField::Assay(axis, f) => {
                let a = self.assay_mut(axis);
                match f {
                    AssayField::Sse => a.sse = real.unwrap_or(0.0),
                    AssayField::Df => a.df = count,
                    AssayField::RelWidth => a.rel_width = real,
                    AssayField::MeasuredSse => a.measured_sse = real.unwrap_or(0.0),
                    AssayField::MeasuredDf => a.measured_df = count,
                    AssayField::MeasuredRelWidth => a.measured_rel_width = real,
                    AssayField::GateState => a.state = gate()?,
                    AssayField::Stable => a.stable = flag,
                }
            }
            BeliefField::EdgeEffectEma => {
                if let FieldValue::Map(m) = value {
                    self.edge.ema = m.clone();
                }
            }
            BeliefField::EdgeTests => self.edge.tests = count,
            BeliefField::EdgeConfident => self.edge.confident = flag,
            BeliefField::DoseCurvatureSeen => self.response.dose_curvature_seen = flag,
            BeliefField::TimeDependenceSeen => self.response.time_dependence_seen = flag,
            BeliefField::TestedCompounds => {
                if let FieldValue::Set(s) = value {
                    self.exploration.tested_compounds = s.clone();
                }
            }
            BeliefField::TestedCellLines => {
                if let FieldValue::Set(s) = value {
                    self.exploration.tested_cell_lines = s.clone();
                }
            }
            BeliefField::ObservationCount => self.exploration.n_observations = count,
            BeliefField::CalibrationWells => {
                if let FieldValue::Map(m) = value {
                    self.exploration.calibration_wells = m
                        .iter()
                        .map(|(k, v)| (k.clone(), v.max(0.0).round() as u64))
                        .collect();
                }
            }
            BeliefField::DebtBits => self.insolvency.debt_bits = real.unwrap_or(0.0),
            BeliefField::ConsecutiveRefusals => self.insolvency.consecutive_refusals = count,
            BeliefField::LastRefusalReason => {
                self.insolvency.last_refusal_reason = match value {
                    FieldValue::Text(s) => Some(s.clone()),
                    _ => None,
                }
            }
            BeliefField::Insolvent => self.insolvency.insolvent = flag,
        }
        Ok(())
    }

    /// Values of every field, for an end-of-update accountability check.
    pub(crate) fn snapshot(&self) -> Vec<(BeliefField, FieldValue)> {
        BeliefField::all()
            .into_iter()
            .map(|f| (f, self.read(f)))
            .collect()
    }

    /// Every field that differs from `before` must be declared by a pending
    /// event of this cycle, and gate fields must carry a gate marker.
    pub(crate) fn verify_accountability(&self, before: &[(BeliefField, FieldValue)]) {
        let cycle = self.ledger.cycle();
        let declared = self.ledger.declared_fields(cycle);
        for (field, prev) in before {
            if self.read(*field) == *prev {
                continue;
            }
            if !declared.contains(field.name()) {
                breach(CovenantViolation::new(
                    Covenant::EvidencePerMutation,
                    format!("{field} changed in cycle {cycle} without an evidence event"),
                ));
            }
            if field.is_gate() && !self.ledger.has_gate_marker(cycle, field.name()) {
                breach(CovenantViolation::new(
                    Covenant::GateMarkerRequired,
                    format!("{field} changed in cycle {cycle} without a gate marker"),
                ));
            }
        }
    }

    /// Mutate a field behind the setter's back.
    #[cfg(test)]
    pub(crate) fn write_unaccounted(&mut self, field: BeliefField, value: FieldValue) {
        self.write(field, &value).expect("typed test write");
    }
}

fn type_mismatch(field: BeliefField, value: &FieldValue) -> BeliefError {
    BeliefError::FieldType {
        field: field.name().to_string(),
        expected: field.expected_kind(),
        got: value.kind(),
    }
}
