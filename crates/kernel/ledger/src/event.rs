use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Typed value of a belief field, as carried in evidence events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Count(u64),
    Real(f64),
    Text(String),
    Series(Vec<f64>),
    Map(BTreeMap<String, f64>),
    Set(BTreeSet<String>),
}

impl FieldValue {
    /// `Real` for `Some`, `Null` for `None`.
    pub fn maybe_real(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Real)
    }

    /// `Text` for `Some`, `Null` for `None`.
    pub fn maybe_text(value: Option<String>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Text)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            FieldValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            FieldValue::Real(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short type tag, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Count(_) => "count",
            FieldValue::Real(_) => "real",
            FieldValue::Text(_) => "text",
            FieldValue::Series(_) => "series",
            FieldValue::Map(_) => "map",
            FieldValue::Set(_) => "set",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Count(n) => write!(f, "{n}"),
            FieldValue::Real(x) => write!(f, "{x:.6}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Series(v) => write!(f, "series[{}]", v.len()),
            FieldValue::Map(m) => write!(f, "map[{}]", m.len()),
            FieldValue::Set(s) => write!(f, "set[{}]", s.len()),
        }
    }
}

/// Marker a gate-type field change must carry in its note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMarker {
    /// Gate earned.
    Event,
    /// Gate lost (revoked).
    Loss,
    /// Gate would have been earned but the evidence is not admissible.
    Shadow,
}

impl GateMarker {
    pub fn prefix(&self) -> &'static str {
        match self {
            GateMarker::Event => "gate_event:",
            GateMarker::Loss => "gate_loss:",
            GateMarker::Shadow => "gate_shadow:",
        }
    }

    /// Build the note text for an axis, e.g. `gate_event:noise_sigma`.
    pub fn note(&self, axis: &str) -> String {
        format!("{}{}", self.prefix(), axis)
    }

    /// Parse the marker at the start of a note, if any.
    pub fn parse(note: &str) -> Option<Self> {
        [GateMarker::Event, GateMarker::Loss, GateMarker::Shadow]
            .into_iter()
            .find(|m| note.starts_with(m.prefix()))
    }
}

/// One belief change, immutable once constructed.
///
/// `evidence_time_h` is when the supporting observation was taken;
/// `claim_time_h` is the timepoint the belief is about (absent for atemporal
/// beliefs). Both are in hours of assay time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEvent {
    pub cycle: u64,
    pub belief: String,
    pub prev: FieldValue,
    pub new: FieldValue,
    pub evidence: BTreeMap<String, f64>,
    pub supporting_conditions: Vec<String>,
    pub note: Option<String>,
    pub evidence_time_h: Option<f64>,
    pub claim_time_h: Option<f64>,
}

impl EvidenceEvent {
    /// Gate marker carried by this event's note.
    pub fn marker(&self) -> Option<GateMarker> {
        self.note.as_deref().and_then(GateMarker::parse)
    }

    pub fn declares(&self, field: &str) -> bool {
        self.belief == field
    }

    /// A shadow event records a non-actionable near-earn; the value is unchanged.
    pub fn is_shadow(&self) -> bool {
        self.marker() == Some(GateMarker::Shadow)
    }
}
