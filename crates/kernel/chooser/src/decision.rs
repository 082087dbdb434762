use std::collections::BTreeMap;
use std::fmt;

use assaypilot_ledger::DecisionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::template::{ActionClass, Template};

/// Receipt template name used by refusals, which choose no template.
pub const REFUSAL_RECEIPT_TEMPLATE: &str = "refuse";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Calibration,
    Biology,
    Refusal,
    Abort,
    Proposal,
}

impl DecisionKind {
    pub fn name(&self) -> &'static str {
        match self {
            DecisionKind::Calibration => "calibration",
            DecisionKind::Biology => "biology",
            DecisionKind::Refusal => "refusal",
            DecisionKind::Abort => "abort",
            DecisionKind::Proposal => "proposal",
        }
    }

    /// Kind of decision a template leads to.
    pub fn for_template(template: Template) -> Self {
        match template.class() {
            ActionClass::Calibration => DecisionKind::Calibration,
            ActionClass::Biology => DecisionKind::Biology,
            ActionClass::Proposal => DecisionKind::Proposal,
            ActionClass::Terminal => DecisionKind::Abort,
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a decision was made.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub summary: String,
    pub rules_fired: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
    pub thresholds: BTreeMap<String, f64>,
}

/// The calibration an abort or refusal would have needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPlan {
    pub template: Template,
    pub wells: u32,
    pub reason: String,
}

/// Mandatory provenance of a decision.
///
/// `template`, `forced`, `trigger`, `regime` and `gate_state` are always
/// present. `enforcement_layer` is present exactly when `forced`;
/// `blocked_template` and `missing_gates` record an override;
/// `attempted_template` and `calibration_plan` explain aborts and refusals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub template: String,
    pub forced: bool,
    pub trigger: String,
    pub regime: String,
    pub gate_state: BTreeMap<String, String>,
    pub enforcement_layer: Option<String>,
    pub blocked_template: Option<String>,
    pub missing_gates: Option<Vec<String>>,
    pub attempted_template: Option<String>,
    pub calibration_plan: Option<CalibrationPlan>,
}

impl Receipt {
    pub fn is_override(&self) -> bool {
        self.blocked_template.is_some() || self.missing_gates.is_some()
    }
}

/// One decision per cycle. Immutable once returned by the chooser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: String,
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: DecisionKind,
    /// Absent for refusals.
    pub template: Option<Template>,
    pub parameters: serde_json::Value,
    /// Estimated wells the action consumes. The budget itself is never
    /// touched here.
    pub wells_requested: u32,
    pub rationale: Rationale,
    pub receipt: Receipt,
    /// blake3 over the canonical JSON of the inputs that produced it.
    pub fingerprint: String,
}

impl Decision {
    /// Whether the decision describes an action to run.
    pub fn is_executable(&self) -> bool {
        !matches!(self.kind, DecisionKind::Refusal | DecisionKind::Abort)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == DecisionKind::Abort
    }

    pub fn action_class(&self) -> Option<ActionClass> {
        self.template.map(|t| t.class())
    }

    /// Flattened decision-stream record.
    pub fn to_record(&self) -> DecisionRecord {
        DecisionRecord {
            cycle: self.cycle,
            decision_id: self.decision_id.clone(),
            kind: self.kind.name().to_string(),
            template: self.template.map(|t| t.name().to_string()),
            receipt_template: self.receipt.template.clone(),
            forced: self.receipt.forced,
            trigger: self.receipt.trigger.clone(),
            regime: self.receipt.regime.clone(),
            enforcement_layer: self.receipt.enforcement_layer.clone(),
            gate_state: self.receipt.gate_state.clone(),
            wells_requested: self.wells_requested,
            summary: self.rationale.summary.clone(),
            fingerprint: self.fingerprint.clone(),
            recorded_at: self.timestamp.to_rfc3339(),
        }
    }
}

/// Inputs hashed into a decision fingerprint.
#[derive(Serialize)]
pub(crate) struct FingerprintInputs<'a> {
    pub cycle: u64,
    pub budget_remaining_wells: u32,
    pub allow_expensive_calibration: bool,
    pub gate_state: &'a BTreeMap<String, String>,
    pub noise_df: u64,
    pub noise_rel_width: Option<f64>,
    pub debt_bits: f64,
    pub kind: DecisionKind,
    pub template: Option<Template>,
    pub parameters: &'a serde_json::Value,
    pub wells_requested: u32,
}

pub(crate) fn fingerprint(inputs: &FingerprintInputs<'_>) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(inputs)?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}
