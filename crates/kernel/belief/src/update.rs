use std::collections::BTreeMap;

use assaypilot_calibration::{drift_metric, pooled_sigma, CalibrationEstimate};
use assaypilot_ledger::{EvidenceEvent, FieldValue, GateMarker, NoiseDiagnostics};
use tracing::{debug, info, warn};

use crate::error::BeliefError;
use crate::field::{AssayField, BeliefField};
use crate::gate::{step, AssayAxis, GateAxis, GateReading, GateState, GateStatus, GateTransition};
use crate::observation::{AssayKind, ConditionSummary, Observation, Position};
use crate::response::{find_dose_curvature, find_time_dependence};
use crate::state::{BeliefState, EvidenceTimes, Support};

/// What one update contributed to the noise axis.
#[derive(Clone, Debug, Default)]
struct NoiseContribution {
    conditions_used: u32,
    df_delta: u64,
    batch_sigma: Option<f64>,
}

/// Vehicle-control replicate totals for one readout.
#[derive(Clone, Debug, Default)]
struct Pool {
    sse: f64,
    df: u64,
    measured_sse: f64,
    measured_df: u64,
    keys: Vec<String>,
}

fn vehicle_pool(observation: &Observation, assay: AssayKind) -> Pool {
    observation
        .conditions
        .iter()
        .filter(|c| c.is_vehicle() && c.assay == assay && c.replicate_df() > 0)
        .fold(Pool::default(), |mut pool, c| {
            pool.sse += c.replicate_sse();
            pool.df += c.replicate_df();
            if !c.proxy {
                pool.measured_sse += c.replicate_sse();
                pool.measured_df += c.replicate_df();
            }
            pool.keys.push(c.key());
            pool
        })
}

impl BeliefState {
    /// Fold one observation into the belief state.
    ///
    /// Returns the evidence events of this update, in mutation order, and the
    /// cycle's noise diagnostics. Every field changed here is declared by one
    /// of the returned events.
    ///
    /// The update is all or nothing: it runs against a staged copy that
    /// replaces the state only on success, so an error leaves both the
    /// fields and the pending events as they were.
    pub fn update(
        &mut self,
        observation: &Observation,
    ) -> Result<(Vec<EvidenceEvent>, NoiseDiagnostics), BeliefError> {
        for c in &observation.conditions {
            c.validate().map_err(BeliefError::InvalidObservation)?;
        }
        let mut staged = self.clone();
        match staged.apply_observation(observation) {
            Ok(outcome) => {
                *self = staged;
                Ok(outcome)
            }
            Err(e) => {
                warn!(cycle = observation.cycle, error = %e, "Update rejected, beliefs unchanged");
                Err(e)
            }
        }
    }

    fn apply_observation(
        &mut self,
        observation: &Observation,
    ) -> Result<(Vec<EvidenceEvent>, NoiseDiagnostics), BeliefError> {
        self.enter_cycle(observation.cycle)?;
        let before = self.snapshot();
        let evidence_time = observation.evidence_time();

        info!(
            cycle = observation.cycle,
            conditions = observation.conditions.len(),
            wells = observation.total_wells(),
            "Updating beliefs"
        );

        self.update_exploration(observation, evidence_time)?;
        let contribution = self.update_noise(observation, evidence_time)?;
        for axis in AssayAxis::LADDER {
            self.update_assay(axis, observation, evidence_time)?;
        }
        self.update_calibration_coverage(observation, evidence_time)?;
        self.update_edge_effect(observation, evidence_time)?;
        self.update_response(observation, evidence_time)?;

        self.verify_accountability(&before);
        let diagnostics = self.noise_diagnostics(contribution);
        let events = self.drain_events();
        debug!(cycle = observation.cycle, events = events.len(), "Beliefs updated");
        Ok((events, diagnostics))
    }

    fn update_exploration(
        &mut self,
        observation: &Observation,
        evidence_time: Option<f64>,
    ) -> Result<(), BeliefError> {
        if observation.conditions.is_empty() {
            return Ok(());
        }
        let times = EvidenceTimes::atemporal(evidence_time);

        let mut compounds = self.exploration.tested_compounds.clone();
        compounds.extend(
            observation
                .conditions
                .iter()
                .filter(|c| !c.is_vehicle())
                .map(|c| c.compound.clone()),
        );
        let mut cell_lines = self.exploration.tested_cell_lines.clone();
        cell_lines.extend(observation.conditions.iter().map(|c| c.cell_line.clone()));
        let n = self.exploration.n_observations + observation.conditions.len() as u64;

        self.set(
            BeliefField::TestedCompounds,
            FieldValue::Set(compounds),
            Support::new(),
            times,
        )?;
        self.set(
            BeliefField::TestedCellLines,
            FieldValue::Set(cell_lines),
            Support::new(),
            times,
        )?;
        self.set(
            BeliefField::ObservationCount,
            FieldValue::Count(n),
            Support::new().metric("conditions", observation.conditions.len() as f64),
            times,
        )?;
        Ok(())
    }

    fn update_noise(
        &mut self,
        observation: &Observation,
        evidence_time: Option<f64>,
    ) -> Result<NoiseContribution, BeliefError> {
        let pool = vehicle_pool(observation, AssayKind::Viability);
        if pool.df == 0 {
            return Ok(NoiseContribution::default());
        }
        let times = EvidenceTimes::atemporal(evidence_time);
        let batch_sigma = pooled_sigma(pool.sse, pool.df);
        let support = Support::new()
            .metric("sse_delta", pool.sse)
            .metric("df_delta", pool.df as f64)
            .maybe_metric("batch_sigma", batch_sigma)
            .conditions(pool.keys.clone());

        let sse = self.noise.sse + pool.sse;
        let df = self.noise.df + pool.df;
        self.set(BeliefField::NoiseSse, FieldValue::Real(sse), support.clone(), times)?;
        self.set(BeliefField::NoiseDf, FieldValue::Count(df), support.clone(), times)?;

        let estimate = CalibrationEstimate::from_pooled(sse, df);
        let sigma = estimate.map(|e| e.sigma);
        let rel_width = estimate.map(|e| e.rel_width);
        self.set(BeliefField::NoiseSigma, FieldValue::maybe_real(sigma), support.clone(), times)?;
        self.set(
            BeliefField::NoiseCiLow,
            FieldValue::maybe_real(estimate.map(|e| e.interval.low)),
            support.clone(),
            times,
        )?;
        self.set(
            BeliefField::NoiseCiHigh,
            FieldValue::maybe_real(estimate.map(|e| e.interval.high)),
            support.clone(),
            times,
        )?;
        self.set(
            BeliefField::NoiseRelWidth,
            FieldValue::maybe_real(rel_width),
            support.clone(),
            times,
        )?;

        let mut history = self.noise.history.clone();
        if let Some(s) = batch_sigma {
            history.push(s);
        }
        let excess = history.len().saturating_sub(self.policy().history_len);
        history.drain(..excess);
        let drift = sigma.and_then(|s| drift_metric(&history, self.policy().drift_window, s));
        self.set(BeliefField::NoiseHistory, FieldValue::Series(history), support.clone(), times)?;
        self.set(BeliefField::NoiseDrift, FieldValue::maybe_real(drift), support.clone(), times)?;

        let reading = GateReading {
            df,
            rel_width,
            drift,
            prerequisite_earned: true,
        };
        let previous = self.noise.status();
        let (status, transition) =
            step(self.policy(), previous, &reading, self.policy().streak_required);
        let gate_support = support
            .metric("rel_width_enter", self.policy().enter_rel_width)
            .metric("rel_width_exit", self.policy().exit_rel_width)
            .maybe_metric("rel_width", rel_width)
            .maybe_metric("drift_metric", drift);
        self.set(
            BeliefField::NoiseStreak,
            FieldValue::Count(u64::from(status.streak)),
            gate_support.clone().note(transition.label()),
            times,
        )?;
        self.commit_gate(GateAxis::Noise, previous.state, status.state, transition, gate_support, times)?;

        Ok(NoiseContribution {
            conditions_used: u32::try_from(pool.keys.len()).unwrap_or(u32::MAX),
            df_delta: pool.df,
            batch_sigma,
        })
    }

    /// Pool vehicle controls for one assay and step its gate.
    ///
    /// Axes that reject proxy evidence gate on the measured-only totals. When
    /// the pooled totals would earn such a gate but the measured ones do not,
    /// the near-earn is recorded as a shadow.
    fn update_assay(
        &mut self,
        axis: AssayAxis,
        observation: &Observation,
        evidence_time: Option<f64>,
    ) -> Result<(), BeliefError> {
        let times = EvidenceTimes::atemporal(evidence_time);
        let pool = vehicle_pool(observation, axis.assay_kind());
        let fed = pool.df > 0;
        let mut support = Support::new().conditions(pool.keys.clone());

        if fed {
            let current = self.assay(axis).clone();
            let sse = current.sse + pool.sse;
            let df = current.df + pool.df;
            let measured_sse = current.measured_sse + pool.measured_sse;
            let measured_df = current.measured_df + pool.measured_df;
            let rel_width = CalibrationEstimate::from_pooled(sse, df).map(|e| e.rel_width);
            let measured_rel_width =
                CalibrationEstimate::from_pooled(measured_sse, measured_df).map(|e| e.rel_width);
            support = support
                .metric("sse_delta", pool.sse)
                .metric("df_delta", pool.df as f64)
                .metric("measured_df_delta", pool.measured_df as f64);

            let writes = [
                (AssayField::Sse, FieldValue::Real(sse)),
                (AssayField::Df, FieldValue::Count(df)),
                (AssayField::RelWidth, FieldValue::maybe_real(rel_width)),
                (AssayField::MeasuredSse, FieldValue::Real(measured_sse)),
                (AssayField::MeasuredDf, FieldValue::Count(measured_df)),
                (AssayField::MeasuredRelWidth, FieldValue::maybe_real(measured_rel_width)),
            ];
            for (field, value) in writes {
                self.set(BeliefField::Assay(axis, field), value, support.clone(), times)?;
            }
        }

        let current = self.assay(axis).clone();
        if current.df == 0 {
            return Ok(());
        }
        let prerequisite_earned = axis
            .gate_axis()
            .prerequisite()
            .map_or(true, |p| self.is_earned(p));
        let pooled = GateReading {
            df: current.df,
            rel_width: current.rel_width,
            drift: None,
            prerequisite_earned,
        };
        let admissible = if axis.rejects_proxy() {
            GateReading {
                df: current.measured_df,
                rel_width: current.measured_rel_width,
                ..pooled
            }
        } else {
            pooled
        };
        let previous = GateStatus {
            state: current.state,
            streak: 0,
        };
        let (status, transition) = step(self.policy(), previous, &admissible, 1);
        let support = support
            .metric("df", current.df as f64)
            .metric("measured_df", current.measured_df as f64)
            .maybe_metric("rel_width", current.rel_width)
            .maybe_metric("measured_rel_width", current.measured_rel_width);

        if fed && axis.rejects_proxy() && !previous.state.is_earned() && !status.state.is_earned()
        {
            let (pooled_status, _) = step(self.policy(), previous, &pooled, 1);
            if pooled_status.state.is_earned() {
                self.record_shadow(
                    BeliefField::Assay(axis, AssayField::Stable),
                    axis.gate_axis(),
                    support
                        .clone()
                        .metric("df_floor", self.policy().df_floor as f64)
                        .metric("rel_width_enter", self.policy().enter_rel_width),
                    times,
                )?;
            }
        }
        self.commit_gate(axis.gate_axis(), previous.state, status.state, transition, support, times)
    }

    fn commit_gate(
        &mut self,
        axis: GateAxis,
        from: GateState,
        to: GateState,
        transition: GateTransition,
        support: Support,
        times: EvidenceTimes,
    ) -> Result<(), BeliefError> {
        if from == to {
            return Ok(());
        }
        match to {
            GateState::Earned => info!(axis = axis.name(), from = from.name(), "Gate earned"),
            _ => warn!(
                axis = axis.name(),
                cause = transition.label(),
                "Gate revoked"
            ),
        }
        self.apply_gate_state(axis, to, support, times)
    }

    fn update_calibration_coverage(
        &mut self,
        observation: &Observation,
        evidence_time: Option<f64>,
    ) -> Result<(), BeliefError> {
        let vehicle: Vec<&ConditionSummary> =
            observation.conditions.iter().filter(|c| c.is_vehicle()).collect();
        if vehicle.is_empty() {
            return Ok(());
        }
        let mut wells: BTreeMap<String, f64> = self
            .exploration
            .calibration_wells
            .iter()
            .map(|(k, v)| (k.clone(), *v as f64))
            .collect();
        for c in &vehicle {
            *wells.entry(c.position.name().to_string()).or_insert(0.0) += f64::from(c.n_wells);
        }
        for position in Position::ALL {
            wells.entry(position.name().to_string()).or_insert(0.0);
        }
        self.set(
            BeliefField::CalibrationWells,
            FieldValue::Map(wells),
            Support::new().conditions(vehicle.iter().map(|c| c.key())),
            EvidenceTimes::atemporal(evidence_time),
        )?;
        Ok(())
    }

    /// Standardized edge-minus-center difference per channel, averaged over
    /// every (assay, cell line, time) group with both positions present.
    fn update_edge_effect(
        &mut self,
        observation: &Observation,
        evidence_time: Option<f64>,
    ) -> Result<(), BeliefError> {
        type GroupKey = (AssayKind, String, u64);
        let mut groups: BTreeMap<GroupKey, (Vec<&ConditionSummary>, Vec<&ConditionSummary>)> =
            BTreeMap::new();
        for c in observation.conditions.iter().filter(|c| c.is_vehicle()) {
            let entry = groups
                .entry((c.assay, c.cell_line.clone(), c.time_h.to_bits()))
                .or_default();
            match c.position {
                Position::Center => entry.0.push(c),
                Position::Edge => entry.1.push(c),
            }
        }

        let mut effects: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut keys = Vec::new();
        for (center_wells, edge_wells) in groups.values() {
            let (Some(center), Some(edge)) =
                (channel_stats(center_wells), channel_stats(edge_wells))
            else {
                continue;
            };
            for (channel, (c_mean, c_sd)) in &center {
                let Some((e_mean, e_sd)) = edge.get(channel) else {
                    continue;
                };
                let scale = ((c_sd * c_sd + e_sd * e_sd) / 2.0).sqrt();
                if scale > 0.0 {
                    effects
                        .entry(channel.clone())
                        .or_default()
                        .push((e_mean - c_mean) / scale);
                }
            }
            keys.extend(center_wells.iter().chain(edge_wells.iter()).map(|s| s.key()));
        }
        if effects.is_empty() {
            return Ok(());
        }
        keys.sort();
        keys.dedup();

        let alpha = self.policy().edge_ema_alpha;
        let mut ema = self.edge.ema.clone();
        let mut support = Support::new().conditions(keys);
        for (channel, values) in &effects {
            let effect = values.iter().sum::<f64>() / values.len() as f64;
            let smoothed = match ema.get(channel) {
                Some(prev) => alpha * effect + (1.0 - alpha) * prev,
                None => effect,
            };
            ema.insert(channel.clone(), smoothed);
            support = support.metric(&format!("effect_{channel}"), effect);
        }
        let tests = self.edge.tests + 1;
        let times = EvidenceTimes::atemporal(evidence_time);

        self.set(BeliefField::EdgeEffectEma, FieldValue::Map(ema), support.clone(), times)?;
        self.set(BeliefField::EdgeTests, FieldValue::Count(tests), support.clone(), times)?;
        if !self.edge.confident && tests >= self.policy().edge_min_tests {
            info!(tests, "Edge effect estimate confident");
            self.set(
                BeliefField::EdgeConfident,
                FieldValue::Bool(true),
                support
                    .metric("tests", tests as f64)
                    .note(GateMarker::Event.note("edge_effect")),
                times,
            )?;
        }
        Ok(())
    }

    fn update_response(
        &mut self,
        observation: &Observation,
        evidence_time: Option<f64>,
    ) -> Result<(), BeliefError> {
        if !self.response.dose_curvature_seen {
            if let Some(finding) = find_dose_curvature(&observation.conditions, self.noise.sigma) {
                info!(series = %finding.series, z = finding.z, "Dose curvature observed");
                self.set(
                    BeliefField::DoseCurvatureSeen,
                    FieldValue::Bool(true),
                    Support::new()
                        .metric("z", finding.z)
                        .metric("doses", finding.doses as f64)
                        .conditions(finding.conditions)
                        .note(finding.series),
                    EvidenceTimes::atemporal(evidence_time),
                )?;
            }
        }
        if !self.response.time_dependence_seen {
            if let Some(finding) = find_time_dependence(&observation.conditions) {
                info!(series = %finding.series, z = finding.z, "Time dependence observed");
                self.set(
                    BeliefField::TimeDependenceSeen,
                    FieldValue::Bool(true),
                    Support::new()
                        .metric("z", finding.z)
                        .metric("early_h", finding.early_h)
                        .metric("late_h", finding.late_h)
                        .conditions(finding.conditions)
                        .note(finding.series),
                    EvidenceTimes::claim(finding.late_h, evidence_time),
                )?;
            }
        }
        Ok(())
    }

    fn noise_diagnostics(&self, contribution: NoiseContribution) -> NoiseDiagnostics {
        let noise = self.noise();
        NoiseDiagnostics {
            cycle: self.cycle(),
            conditions_used: contribution.conditions_used,
            df_delta: contribution.df_delta,
            df_total: noise.df,
            batch_sigma: contribution.batch_sigma,
            sigma_hat: noise.sigma,
            ci_low: noise.ci_low,
            ci_high: noise.ci_high,
            rel_width: noise.rel_width,
            drift_metric: noise.drift,
            streak: noise.streak,
            gate_state: noise.state.name().to_string(),
            stable: noise.stable,
        }
    }
}

/// Well-weighted mean and pooled sd per channel.
fn channel_stats(summaries: &[&ConditionSummary]) -> Option<BTreeMap<String, (f64, f64)>> {
    let mut acc: BTreeMap<String, (f64, f64, f64, f64)> = BTreeMap::new();
    for s in summaries {
        let n = f64::from(s.n_wells);
        let df = s.replicate_df() as f64;
        for (channel, mean, sd) in s.channels() {
            let e = acc.entry(channel).or_insert((0.0, 0.0, 0.0, 0.0));
            e.0 += n;
            e.1 += n * mean;
            e.2 += df * sd * sd;
            e.3 += df;
        }
    }
    let stats: BTreeMap<String, (f64, f64)> = acc
        .into_iter()
        .filter(|(_, (n, _, _, df))| *n > 0.0 && *df > 0.0)
        .map(|(ch, (n, sum, sse, df))| (ch, (sum / n, (sse / df).sqrt())))
        .collect();
    (!stats.is_empty()).then_some(stats)
}
