use assaypilot_belief::{AssayKind, BeliefState, ConditionSummary, GateAxis, Observation, Position};

pub const CELL_LINE: &str = "A549";
pub const TIME_H: f64 = 24.0;

/// Vehicle-control summary with a mean of 1.0.
pub fn dmso(assay: AssayKind, position: Position, n_wells: u32, std: f64) -> ConditionSummary {
    ConditionSummary::new(CELL_LINE, "DMSO", 0.0, TIME_H, assay, position, n_wells, 1.0, std)
}

/// Treated summary on the primary readout.
pub fn treated(
    compound: &str,
    dose_um: f64,
    time_h: f64,
    n_wells: u32,
    mean: f64,
    std: f64,
) -> ConditionSummary {
    ConditionSummary::new(
        CELL_LINE,
        compound,
        dose_um,
        time_h,
        AssayKind::Viability,
        Position::Center,
        n_wells,
        mean,
        std,
    )
}

/// The 96-well first-cycle plate: half center, half edge.
pub fn full_plate(cycle: u64, std: f64) -> Observation {
    Observation::new(
        cycle,
        vec![
            dmso(AssayKind::Viability, Position::Center, 48, std),
            dmso(AssayKind::Viability, Position::Edge, 48, std),
        ],
    )
}

/// A center-only vehicle batch on the primary readout.
pub fn center_batch(cycle: u64, n_wells: u32, std: f64) -> Observation {
    Observation::new(
        cycle,
        vec![dmso(AssayKind::Viability, Position::Center, n_wells, std)],
    )
}

/// Vehicle plate covering both positions for every listed assay.
pub fn vehicle_plate(cycle: u64, assays: &[AssayKind], per_position: u32, std: f64) -> Observation {
    let conditions = assays
        .iter()
        .flat_map(|&assay| {
            Position::ALL
                .into_iter()
                .map(move |position| dmso(assay, position, per_position, std))
        })
        .collect();
    Observation::new(cycle, conditions)
}

/// Feed large vehicle plates from `first_cycle` until the noise gate is
/// earned. Returns the cycle it was earned on.
///
/// Panics if the gate is not earned within ten cycles.
pub fn earn_noise_gate(beliefs: &mut BeliefState, first_cycle: u64) -> u64 {
    for cycle in first_cycle..first_cycle + 10 {
        let obs = vehicle_plate(cycle, &[AssayKind::Viability], 100, 0.1);
        if let Err(e) = beliefs.update(&obs) {
            panic!("vehicle plate rejected at cycle {cycle}: {e}");
        }
        if beliefs.is_earned(GateAxis::Noise) {
            return cycle;
        }
    }
    panic!("noise gate not earned within ten cycles")
}
