use std::collections::BTreeMap;

use assaypilot_belief::{BeliefState, GateAxis, GateState, Position};
use serde_json::json;

use crate::config::ChooserConfig;
use crate::decision::{
    CalibrationPlan, DecisionKind, Rationale, Receipt, REFUSAL_RECEIPT_TEMPLATE,
};
use crate::template::Template;
use crate::traits::BatchSizingPolicy;

/// Result of a single stage evaluation.
#[derive(Clone, Debug)]
pub enum StageResult {
    /// Stage has nothing to enforce; continue to the next stage.
    Continue,
    /// Stage decided; the pipeline stops here.
    Decide(DecisionDraft),
}

impl StageResult {
    pub fn is_decision(&self) -> bool {
        matches!(self, StageResult::Decide(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageResult::Continue => "continue",
            StageResult::Decide(_) => "decide",
        }
    }
}

/// Biology the pipeline would run if every gate allowed it.
#[derive(Clone, Debug, PartialEq)]
pub struct BiologyCandidate {
    pub template: Template,
    pub compound: String,
    pub cell_line: String,
    pub doses_um: Vec<f64>,
    pub timepoints_h: Vec<f64>,
    pub replicates: u32,
    /// Exploration rule that picked it.
    pub reason: &'static str,
}

impl BiologyCandidate {
    pub fn wells(&self) -> u32 {
        let conditions = self.doses_um.len() * self.timepoints_h.len();
        let per_condition = self.replicates as usize * self.template.positions().len();
        u32::try_from(conditions * per_condition).unwrap_or(u32::MAX)
    }

    pub fn parameters(&self) -> serde_json::Value {
        json!({
            "compound": self.compound,
            "cell_line": self.cell_line,
            "doses_um": self.doses_um,
            "timepoints_h": self.timepoints_h,
            "replicates": self.replicates,
            "positions": positions_json(self.template.positions()),
        })
    }
}

fn positions_json(positions: &[Position]) -> Vec<&'static str> {
    positions.iter().map(|p| p.name()).collect()
}

/// A decision before identity, timestamp and fingerprint are assigned.
#[derive(Clone, Debug)]
pub struct DecisionDraft {
    pub kind: DecisionKind,
    pub template: Option<Template>,
    pub parameters: serde_json::Value,
    pub wells: u32,
    pub rationale: Rationale,
    pub receipt: Receipt,
}

impl DecisionDraft {
    pub fn new(
        kind: DecisionKind,
        template: Option<Template>,
        regime: &str,
        gate_state: BTreeMap<String, String>,
    ) -> Self {
        let receipt_template = template.map_or(REFUSAL_RECEIPT_TEMPLATE, |t| t.name());
        Self {
            kind,
            template,
            parameters: serde_json::Value::Null,
            wells: 0,
            rationale: Rationale::default(),
            receipt: Receipt {
                template: receipt_template.to_string(),
                regime: regime.to_string(),
                gate_state,
                ..Receipt::default()
            },
        }
    }

    pub fn wells(mut self, wells: u32) -> Self {
        self.wells = wells;
        self
    }

    pub fn parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.rationale.summary = summary.into();
        self
    }

    pub fn rule(mut self, tag: impl Into<String>) -> Self {
        self.rationale.rules_fired.push(tag.into());
        self
    }

    pub fn metric(mut self, key: &str, value: f64) -> Self {
        if value.is_finite() {
            self.rationale.metrics.insert(key.to_string(), value);
        }
        self
    }

    pub fn maybe_metric(self, key: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.metric(key, v),
            None => self,
        }
    }

    pub fn threshold(mut self, key: &str, value: f64) -> Self {
        self.rationale.thresholds.insert(key.to_string(), value);
        self
    }

    pub fn trigger(mut self, trigger: impl Into<String>) -> Self {
        self.receipt.trigger = trigger.into();
        self
    }

    /// Mark as forced by `layer`.
    pub fn forced(mut self, layer: &str) -> Self {
        self.receipt.forced = true;
        self.receipt.enforcement_layer = Some(layer.to_string());
        self
    }

    /// Record what the forced decision displaced.
    pub fn overriding(mut self, blocked: Option<&BiologyCandidate>, missing: Vec<String>) -> Self {
        self.receipt.blocked_template = blocked.map(|c| c.template.name().to_string());
        self.receipt.missing_gates = Some(missing);
        self
    }

    pub fn attempted(mut self, template: Template) -> Self {
        self.receipt.attempted_template = Some(template.name().to_string());
        self
    }

    pub fn plan(mut self, plan: CalibrationPlan) -> Self {
        self.receipt.calibration_plan = Some(plan);
        self
    }
}

/// Context passed through every stage of one `choose_next` call.
pub struct ChooserContext<'a> {
    pub beliefs: &'a BeliefState,
    pub config: &'a ChooserConfig,
    pub sizing: &'a dyn BatchSizingPolicy,
    pub budget_remaining_wells: u32,
    pub cycle: u64,
    pub allow_expensive_calibration: bool,
    /// Results from each stage (stage_name, result label).
    pub stage_results: Vec<(String, &'static str)>,
    candidate: Option<BiologyCandidate>,
}

impl<'a> ChooserContext<'a> {
    pub fn new(
        beliefs: &'a BeliefState,
        config: &'a ChooserConfig,
        sizing: &'a dyn BatchSizingPolicy,
        budget_remaining_wells: u32,
        cycle: u64,
        allow_expensive_calibration: bool,
    ) -> Self {
        Self {
            beliefs,
            config,
            sizing,
            budget_remaining_wells,
            cycle,
            allow_expensive_calibration,
            stage_results: Vec::new(),
            candidate: crate::stages::biology::select_candidate(beliefs, config),
        }
    }

    pub fn record_stage(&mut self, stage_name: impl Into<String>, result: &StageResult) {
        self.stage_results.push((stage_name.into(), result.label()));
    }

    /// Biology the pipeline would run if no gate intervened.
    pub fn candidate(&self) -> Option<&BiologyCandidate> {
        self.candidate.as_ref()
    }

    pub fn affordable(&self, wells: u32) -> bool {
        wells <= self.budget_remaining_wells
    }

    /// Operating regime, as recorded on receipts.
    pub fn regime(&self) -> &'static str {
        if self.beliefs.is_insolvent() {
            "insolvent"
        } else {
            match self.beliefs.gate_state(GateAxis::Noise) {
                GateState::Revoked => "gate_revoked",
                GateState::Undetermined => "pre_gate",
                GateState::Earned => "in_gate",
            }
        }
    }

    /// Draft pre-filled with the regime and gate snapshot.
    pub fn draft(&self, kind: DecisionKind, template: Option<Template>) -> DecisionDraft {
        DecisionDraft::new(kind, template, self.regime(), self.beliefs.gate_snapshot())
            .metric("budget_remaining_wells", f64::from(self.budget_remaining_wells))
            .metric("noise_df", self.beliefs.noise().df as f64)
            .maybe_metric("noise_rel_width", self.beliefs.noise().rel_width)
            .metric("debt_bits", self.beliefs.debt_bits())
    }

    /// Terminal abort explaining the calibration that could not run.
    pub fn abort(
        &self,
        layer: &str,
        trigger: &str,
        attempted: Template,
        wells: u32,
        reason: impl Into<String>,
    ) -> DecisionDraft {
        let reason = reason.into();
        self.draft(DecisionKind::Abort, Some(Template::Abort))
            .forced(layer)
            .trigger(trigger)
            .attempted(attempted)
            .plan(CalibrationPlan {
                template: attempted,
                wells,
                reason: reason.clone(),
            })
            .summary(reason)
            .rule(format!("{layer}:abort"))
            .metric("wells_needed", f64::from(wells))
    }

    /// Forced vehicle-control calibration, or an abort when the budget cannot
    /// cover it.
    pub fn forced_calibration(
        &self,
        template: Template,
        wells: u32,
        layer: &str,
        trigger: &str,
        summary: impl Into<String>,
    ) -> DecisionDraft {
        let summary = summary.into();
        if !self.affordable(wells) {
            return self.abort(
                layer,
                "calibration_unaffordable",
                template,
                wells,
                format!(
                    "{summary}; {template} needs {wells} wells, {} remain",
                    self.budget_remaining_wells
                ),
            );
        }
        self.draft(DecisionKind::Calibration, Some(template))
            .forced(layer)
            .trigger(trigger)
            .wells(wells)
            .parameters(json!({
                "compound": assaypilot_belief::VEHICLE,
                "wells": wells,
                "positions": positions_json(template.positions()),
            }))
            .summary(summary)
            .rule(format!("{layer}:{trigger}"))
    }
}
