//! Property tests: pooled degrees of freedom never decrease, whatever the
//! sequence of observations.

use assaypilot_belief::{AssayAxis, AssayKind, BeliefState, ConditionSummary, Observation, Position};
use assaypilot_calibration::{relative_width_for_df, DEFAULT_CONFIDENCE};
use assaypilot_conformance::fixtures::{dmso, treated};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_assay() -> impl Strategy<Value = AssayKind> {
    prop_oneof![
        Just(AssayKind::Viability),
        Just(AssayKind::Ldh),
        Just(AssayKind::Scrna),
    ]
}

fn arb_position() -> impl Strategy<Value = Position> {
    prop_oneof![Just(Position::Center), Just(Position::Edge)]
}

fn arb_condition() -> impl Strategy<Value = ConditionSummary> {
    prop_oneof![
        3 => (arb_assay(), arb_position(), 1u32..40, 0.01f64..0.5)
            .prop_map(|(assay, position, n, std)| dmso(assay, position, n, std)),
        1 => (0.1f64..100.0, 1u32..6, 0.1f64..1.0)
            .prop_map(|(dose, n, mean)| treated("tbhp", dose, 24.0, n, mean, 0.05)),
    ]
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<ConditionSummary>>> {
    prop::collection::vec(prop::collection::vec(arb_condition(), 0..5), 1..12)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Noise df and every assay df are non-decreasing across cycles.
    #[test]
    fn df_never_decreases(batches in arb_batches()) {
        let mut beliefs = BeliefState::new();
        let mut noise_df = 0u64;
        let mut assay_df = [0u64; 3];
        let mut measured_df = [0u64; 3];
        let axes = [AssayAxis::Ldh, AssayAxis::CellPaint, AssayAxis::Scrna];

        for (cycle, conditions) in batches.into_iter().enumerate() {
            let obs = Observation::new(cycle as u64, conditions);
            let (_, diag) = beliefs.update(&obs).unwrap();

            prop_assert!(diag.df_total >= noise_df);
            prop_assert_eq!(diag.df_total - noise_df, diag.df_delta);
            noise_df = diag.df_total;

            for (i, axis) in axes.iter().enumerate() {
                let state = beliefs.assay(*axis);
                prop_assert!(state.df >= assay_df[i]);
                prop_assert!(state.measured_df >= measured_df[i]);
                prop_assert!(state.measured_df <= state.df);
                assay_df[i] = state.df;
                measured_df[i] = state.measured_df;
            }
        }
    }

    /// Every df change is declared by an evidence event in the same cycle.
    #[test]
    fn df_changes_are_declared(batches in arb_batches()) {
        let mut beliefs = BeliefState::new();
        for (cycle, conditions) in batches.into_iter().enumerate() {
            let before = beliefs.noise().df;
            let (events, _) = beliefs.update(&Observation::new(cycle as u64, conditions)).unwrap();
            let declared = events.iter().any(|e| e.belief == "noise_df");
            prop_assert_eq!(declared, beliefs.noise().df != before);
        }
    }

    /// The relative width of the pooled noise estimate depends on df alone.
    #[test]
    fn relative_width_tracks_df_not_scale(batches in arb_batches()) {
        let mut beliefs = BeliefState::new();
        for (cycle, conditions) in batches.into_iter().enumerate() {
            let (_, diag) = beliefs.update(&Observation::new(cycle as u64, conditions)).unwrap();
            match (diag.rel_width, relative_width_for_df(diag.df_total, DEFAULT_CONFIDENCE)) {
                (Some(observed), Some(planned)) => prop_assert!((observed - planned).abs() < 1e-9),
                (observed, planned) => prop_assert_eq!(observed.is_some(), planned.is_some()),
            }
        }
    }
}
