//! Belief-state fixtures for stage tests.

use assaypilot_belief::{AssayKind, BeliefState, ConditionSummary, GateAxis, Observation, Position};

pub(crate) fn vehicle(assay: AssayKind, position: Position, n: u32, std: f64) -> ConditionSummary {
    ConditionSummary::new("A549", "DMSO", 0.0, 24.0, assay, position, n, 1.0, std)
}

fn plate(cycle: u64, assays: &[AssayKind], n: u32, std: f64) -> Observation {
    let conditions = assays
        .iter()
        .flat_map(|&assay| Position::ALL.into_iter().map(move |p| vehicle(assay, p, n, std)))
        .collect();
    Observation::new(cycle, conditions)
}

/// Three large, tight vehicle plates: noise gate earned at cycle 2, edge
/// effect characterized.
pub(crate) fn noise_earned() -> BeliefState {
    let mut beliefs = BeliefState::new();
    for cycle in 0..3 {
        beliefs
            .update(&plate(cycle, &[AssayKind::Viability], 100, 0.1))
            .unwrap();
    }
    assert!(beliefs.is_earned(GateAxis::Noise));
    assert!(beliefs.edge().confident);
    beliefs
}

/// Noise, LDH and Cell Painting gates all earned by cycle 2.
pub(crate) fn cheap_gates_earned() -> BeliefState {
    let assays = [AssayKind::Viability, AssayKind::Ldh, AssayKind::CellPainting];
    let mut beliefs = BeliefState::new();
    for cycle in 0..3 {
        beliefs.update(&plate(cycle, &assays, 100, 0.1)).unwrap();
    }
    assert!(beliefs.is_earned(GateAxis::Ldh));
    assert!(beliefs.is_earned(GateAxis::CellPaint));
    beliefs
}

/// Noise gate earned at cycle 2, then revoked by drift at cycle 5.
pub(crate) fn noise_revoked() -> BeliefState {
    let mut beliefs = noise_earned();
    for cycle in 3..6 {
        beliefs
            .update(&plate(cycle, &[AssayKind::Viability], 6, 0.3))
            .unwrap();
    }
    assert_eq!(
        beliefs.gate_state(GateAxis::Noise),
        assaypilot_belief::GateState::Revoked
    );
    beliefs
}
