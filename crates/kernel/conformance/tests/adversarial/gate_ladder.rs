//! Adversarial test: assay gates cannot be earned out of ladder order, and
//! scRNA cannot be earned from proxy evidence.
//!
//! Ladder: noise -> LDH -> Cell Painting -> scRNA.

use assaypilot_belief::{
    AssayAxis, AssayKind, BeliefState, GateAxis, GateState, Observation, Position,
};
use assaypilot_chooser::{Chooser, ChooserConfig, DecisionKind, Template};
use assaypilot_conformance::fixtures::{dmso, vehicle_plate};

const CHEAP: [AssayKind; 3] = [AssayKind::Viability, AssayKind::Ldh, AssayKind::CellPainting];

fn cheap_gates_earned() -> BeliefState {
    let mut beliefs = BeliefState::new();
    for cycle in 0..3 {
        beliefs.update(&vehicle_plate(cycle, &CHEAP, 100, 0.1)).unwrap();
    }
    assert!(beliefs.is_earned(GateAxis::CellPaint));
    beliefs
}

// ---------------------------------------------------------------------------
// Tests: Ladder order
// ---------------------------------------------------------------------------

#[test]
fn ldh_waits_for_noise_then_follows_in_the_same_cycle() {
    let mut beliefs = BeliefState::new();
    let assays = [AssayKind::Viability, AssayKind::Ldh];
    for cycle in 0..3 {
        beliefs.update(&vehicle_plate(cycle, &assays, 100, 0.1)).unwrap();
        let noise = beliefs.is_earned(GateAxis::Noise);
        assert_eq!(noise, cycle == 2, "cycle {cycle}");
        assert_eq!(beliefs.is_earned(GateAxis::Ldh), noise, "cycle {cycle}");
    }
    // Qualifying LDH evidence was present from the first cycle.
    assert!(beliefs.assay(AssayAxis::Ldh).rel_width.unwrap() < 0.25);
}

#[test]
fn cell_painting_cannot_skip_ldh() {
    let mut beliefs = BeliefState::new();
    let assays = [AssayKind::Viability, AssayKind::CellPainting];
    for cycle in 0..4 {
        beliefs.update(&vehicle_plate(cycle, &assays, 100, 0.1)).unwrap();
    }
    assert!(beliefs.is_earned(GateAxis::Noise));
    assert_eq!(beliefs.gate_state(GateAxis::Ldh), GateState::Undetermined);
    assert_eq!(beliefs.gate_state(GateAxis::CellPaint), GateState::Undetermined);

    // One LDH plate unblocks the rung above it.
    beliefs.update(&vehicle_plate(4, &[AssayKind::Ldh], 100, 0.1)).unwrap();
    assert!(beliefs.is_earned(GateAxis::Ldh));
    assert!(beliefs.is_earned(GateAxis::CellPaint));
}

#[test]
fn chooser_calibrates_the_lowest_missing_rung() {
    let mut beliefs = BeliefState::new();
    let assays = [AssayKind::Viability, AssayKind::CellPainting];
    for cycle in 0..3 {
        beliefs.update(&vehicle_plate(cycle, &assays, 100, 0.1)).unwrap();
    }
    let mut chooser = Chooser::standard(ChooserConfig::default());
    let decision = chooser.choose_next(&mut beliefs, 2000, 3, false).unwrap();

    assert_eq!(decision.template, Some(Template::CalibrateLdhBaseline));
    assert_eq!(decision.receipt.trigger, "assay_gate_not_earned");
    let missing = decision.receipt.missing_gates.clone().unwrap();
    assert!(missing.contains(&"ldh".to_string()));
    assert!(missing.contains(&"cell_paint".to_string()));
}

// ---------------------------------------------------------------------------
// Tests: Proxy evidence
// ---------------------------------------------------------------------------

#[test]
fn proxy_scrna_only_leaves_a_shadow() {
    let mut beliefs = cheap_gates_earned();
    let (events, _) = beliefs.update(&proxy_scrna_plate(3)).unwrap();

    let scrna = beliefs.assay(AssayAxis::Scrna);
    assert_eq!(scrna.df, 198);
    assert_eq!(scrna.measured_df, 0);
    assert!(!scrna.stable);
    assert_eq!(beliefs.gate_state(GateAxis::Scrna), GateState::Undetermined);

    let shadows: Vec<_> = events.iter().filter(|e| e.is_shadow()).collect();
    assert_eq!(shadows.len(), 1);
    assert_eq!(shadows[0].belief, "scrna_sigma_stable");
    assert_eq!(shadows[0].prev, shadows[0].new);
    assert_eq!(shadows[0].note.as_deref(), Some("gate_shadow:scrna"));
}

fn proxy_scrna_plate(cycle: u64) -> Observation {
    Observation::new(
        cycle,
        Position::ALL
            .into_iter()
            .map(|p| dmso(AssayKind::Scrna, p, 100, 0.1).as_proxy())
            .collect(),
    )
}

#[test]
fn proxy_df_does_not_narrow_the_scrna_width() {
    let mut beliefs = cheap_gates_earned();
    beliefs.update(&proxy_scrna_plate(3)).unwrap();

    // 58 measured df: past the df floor, but too few for the width threshold.
    let (events, _) = beliefs
        .update(&vehicle_plate(4, &[AssayKind::Scrna], 30, 0.1))
        .unwrap();
    let scrna = beliefs.assay(AssayAxis::Scrna);
    assert_eq!(scrna.df, 256);
    assert_eq!(scrna.measured_df, 58);
    assert!(scrna.rel_width.unwrap() < 0.25);
    assert!(scrna.measured_rel_width.unwrap() > 0.25);
    assert!(!beliefs.is_earned(GateAxis::Scrna));
    assert!(!scrna.stable);

    let shadows: Vec<_> = events.iter().filter(|e| e.is_shadow()).collect();
    assert_eq!(shadows.len(), 1);
    assert_eq!(shadows[0].note.as_deref(), Some("gate_shadow:scrna"));
    assert!(events
        .iter()
        .all(|e| e.note.as_deref() != Some("gate_event:scrna")));
}

#[test]
fn measured_scrna_earns_the_gate() {
    let mut beliefs = cheap_gates_earned();
    beliefs.update(&proxy_scrna_plate(3)).unwrap();
    beliefs
        .update(&vehicle_plate(4, &[AssayKind::Scrna], 30, 0.1))
        .unwrap();
    assert!(!beliefs.is_earned(GateAxis::Scrna));

    let (events, _) = beliefs
        .update(&vehicle_plate(5, &[AssayKind::Scrna], 100, 0.1))
        .unwrap();
    let scrna = beliefs.assay(AssayAxis::Scrna);
    assert_eq!(scrna.measured_df, 256);
    assert!(scrna.measured_rel_width.unwrap() < 0.25);
    assert!(beliefs.is_earned(GateAxis::Scrna));
    assert!(events.iter().all(|e| !e.is_shadow()));
}

#[test]
fn scrna_calibration_needs_authorization() {
    let config = ChooserConfig {
        required_assay_gates: vec![AssayAxis::Ldh, AssayAxis::CellPaint, AssayAxis::Scrna],
        ..ChooserConfig::default()
    };

    let mut beliefs = cheap_gates_earned();
    let mut chooser = Chooser::standard(config.clone());
    let refused = chooser.choose_next(&mut beliefs, 5000, 3, false).unwrap();
    assert_eq!(refused.kind, DecisionKind::Abort);
    assert_eq!(refused.receipt.trigger, "unauthorized_expensive_calibration");
    assert_eq!(
        refused.receipt.attempted_template.as_deref(),
        Some("calibrate_scrna_baseline")
    );

    let mut beliefs = cheap_gates_earned();
    let mut chooser = Chooser::standard(config);
    let allowed = chooser.choose_next(&mut beliefs, 5000, 3, true).unwrap();
    assert_eq!(allowed.kind, DecisionKind::Calibration);
    assert_eq!(allowed.template, Some(Template::CalibrateScrnaBaseline));
}
