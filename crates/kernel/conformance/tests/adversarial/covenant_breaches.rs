//! Adversarial test: tampered receipts and unmarked gate changes halt the
//! process instead of being recorded.
//!
//! Covenant breaches are not errors; every test here expects a panic naming
//! the violated covenant.

use assaypilot_belief::{
    step, BeliefField, BeliefState, EvidenceTimes, GatePolicy, GateReading, GateState,
    GateStatus, Support,
};
use assaypilot_chooser::{receipt, Chooser, ChooserConfig, Decision};
use assaypilot_ledger::FieldValue;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn first_decision() -> Decision {
    let mut chooser = Chooser::standard(ChooserConfig::default());
    chooser.choose_next(&mut BeliefState::new(), 1000, 0, false).unwrap()
}

fn refusal() -> Decision {
    let mut beliefs = BeliefState::new();
    beliefs.record_information_claim(3.0, 0.0).unwrap();
    let mut chooser = Chooser::standard(ChooserConfig::default());
    chooser.choose_next(&mut beliefs, 5, 1, false).unwrap()
}

// ---------------------------------------------------------------------------
// Tests: Receipt tampering
// ---------------------------------------------------------------------------

#[test]
fn untampered_decisions_pass() {
    receipt::validate(&first_decision());
    receipt::validate(&refusal());
}

#[test]
#[should_panic(expected = "receipt-complete")]
fn stripped_trigger_halts() {
    let mut decision = first_decision();
    decision.receipt.trigger.clear();
    receipt::validate(&decision);
}

#[test]
#[should_panic(expected = "receipt-complete")]
fn forced_without_layer_halts() {
    let mut decision = first_decision();
    decision.receipt.enforcement_layer = None;
    receipt::validate(&decision);
}

#[test]
#[should_panic(expected = "receipt-complete")]
fn empty_gate_snapshot_halts() {
    let mut decision = first_decision();
    decision.receipt.gate_state.clear();
    receipt::validate(&decision);
}

#[test]
#[should_panic(expected = "receipt-complete")]
fn override_outside_an_override_layer_halts() {
    let mut decision = first_decision();
    assert_eq!(decision.receipt.enforcement_layer.as_deref(), Some("cycle0"));
    decision.receipt.missing_gates = Some(vec!["noise_sigma".into()]);
    receipt::validate(&decision);
}

#[test]
#[should_panic(expected = "refusal-explained")]
fn unexplained_refusal_halts() {
    let mut decision = refusal();
    decision.receipt.attempted_template = None;
    decision.receipt.calibration_plan = None;
    receipt::validate(&decision);
}

// ---------------------------------------------------------------------------
// Tests: Gate fields
// ---------------------------------------------------------------------------

#[test]
#[should_panic(expected = "gate-marker-required")]
fn gate_flag_without_marker_halts() {
    let mut beliefs = BeliefState::new();
    let _ = beliefs.set(
        BeliefField::NoiseStable,
        FieldValue::Bool(true),
        Support::new().metric("rel_width", 0.1),
        EvidenceTimes::atemporal(None),
    );
}

#[test]
#[should_panic(expected = "gate-marker-required")]
fn shadow_marker_cannot_change_a_gate() {
    let mut beliefs = BeliefState::new();
    let _ = beliefs.set(
        BeliefField::NoiseGateState,
        FieldValue::Text("earned".into()),
        Support::new().note("gate_shadow:noise_sigma"),
        EvidenceTimes::atemporal(None),
    );
}

#[test]
fn gate_event_marker_is_accepted() {
    let mut beliefs = BeliefState::new();
    let changed = beliefs
        .set(
            BeliefField::EdgeConfident,
            FieldValue::Bool(true),
            Support::new().note("gate_event:edge_effect"),
            EvidenceTimes::atemporal(None),
        )
        .unwrap();
    assert!(changed);
    assert!(beliefs.edge().confident);
}

#[test]
#[should_panic(expected = "stable-implies-width")]
fn earned_gate_without_width_halts() {
    let status = GateStatus {
        state: GateState::Earned,
        streak: 3,
    };
    let reading = GateReading {
        df: 120,
        rel_width: None,
        drift: None,
        prerequisite_earned: true,
    };
    let _ = step(&GatePolicy::default(), status, &reading, 3);
}
