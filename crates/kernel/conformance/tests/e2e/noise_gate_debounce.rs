//! E2E test: the noise gate is earned only after the debounce streak.
//!
//! A 96-well first plate, then 12 center wells per cycle with a slowly
//! falling standard deviation. The relative width crosses the enter
//! threshold at cycle 3 and the gate follows two cycles later.

use assaypilot_belief::{BeliefState, GateAxis, GateState, Position};
use assaypilot_chooser::{Chooser, ChooserConfig, DecisionKind, Template};
use assaypilot_conformance::fixtures::{center_batch, full_plate};

const BUDGET: u32 = 1000;

fn std_at(cycle: u64) -> f64 {
    0.100 - 0.001 * cycle as f64
}

#[test]
fn gate_follows_width_crossing_by_two_cycles() {
    let mut beliefs = BeliefState::new();
    let (_, diag) = beliefs.update(&full_plate(0, std_at(0))).unwrap();
    assert_eq!(diag.df_total, 94);
    assert_eq!(diag.streak, 0);

    let mut crossed_at = None;
    let mut earned_at = None;
    let mut expected_streak = [0u32; 6];
    expected_streak[3] = 1;
    expected_streak[4] = 2;
    expected_streak[5] = 3;

    for cycle in 1..=5u64 {
        let (_, diag) = beliefs.update(&center_batch(cycle, 12, std_at(cycle))).unwrap();
        assert_eq!(diag.df_total, 94 + 11 * cycle);
        assert_eq!(diag.df_delta, 11);

        let width = diag.rel_width.unwrap();
        if width <= 0.25 && crossed_at.is_none() {
            crossed_at = Some(cycle);
        }
        assert_eq!(diag.streak, expected_streak[cycle as usize], "cycle {cycle}");
        if diag.stable && earned_at.is_none() {
            earned_at = Some(cycle);
        }
        assert_eq!(beliefs.is_earned(GateAxis::Noise), cycle == 5, "cycle {cycle}");
    }

    assert_eq!(crossed_at, Some(3));
    assert_eq!(earned_at, Some(5));
    assert_eq!(beliefs.gate_state(GateAxis::Noise), GateState::Earned);
    assert!(beliefs.noise().drift.unwrap() < beliefs.policy().drift_threshold);
}

#[test]
fn gate_earning_carries_a_marker_in_its_cycle() {
    let mut beliefs = BeliefState::new();
    beliefs.update(&full_plate(0, std_at(0))).unwrap();

    let mut earning_events = Vec::new();
    for cycle in 1..=5u64 {
        let (events, _) = beliefs.update(&center_batch(cycle, 12, std_at(cycle))).unwrap();
        earning_events.extend(
            events
                .into_iter()
                .filter(|e| e.belief == "noise_sigma_stable" || e.belief == "noise_gate_state"),
        );
    }

    assert!(!earning_events.is_empty());
    for event in &earning_events {
        assert_eq!(event.cycle, 5);
        assert_eq!(event.note.as_deref(), Some("gate_event:noise_sigma"));
    }
}

#[test]
fn chooser_characterizes_edges_until_the_gate_then_climbs_the_ladder() {
    let mut beliefs = BeliefState::new();
    let mut chooser = Chooser::standard(ChooserConfig::default());

    let first = chooser.choose_next(&mut beliefs, BUDGET, 0, false).unwrap();
    assert_eq!(first.template, Some(Template::Cycle0FullPlate));
    assert_eq!(first.wells_requested, 96);
    assert!(first.receipt.forced);
    assert_eq!(first.receipt.enforcement_layer.as_deref(), Some("cycle0"));
    assert_eq!(Template::Cycle0FullPlate.positions(), Position::ALL.as_slice());

    beliefs.update(&full_plate(0, std_at(0))).unwrap();

    for cycle in 1..=5u64 {
        beliefs.update(&center_batch(cycle, 12, std_at(cycle))).unwrap();
        let decision = chooser.choose_next(&mut beliefs, BUDGET, cycle, false).unwrap();
        assert_eq!(decision.kind, DecisionKind::Calibration);
        assert!(decision.receipt.forced);

        if cycle < 5 {
            assert_eq!(decision.template, Some(Template::EdgeCenterTest), "cycle {cycle}");
            assert_eq!(decision.receipt.enforcement_layer.as_deref(), Some("noise_gate"));
            assert_eq!(decision.receipt.regime, "pre_gate");
            assert_eq!(
                decision.receipt.missing_gates.as_deref(),
                Some(["noise_sigma".to_string()].as_slice())
            );
        } else {
            assert_eq!(decision.template, Some(Template::CalibrateLdhBaseline));
            assert_eq!(decision.receipt.enforcement_layer.as_deref(), Some("assay_gate"));
            assert_eq!(decision.receipt.regime, "in_gate");
            assert_eq!(decision.receipt.gate_state["noise_sigma"], "earned");
        }
    }

    let cycles: Vec<u64> = chooser.log().records().iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, vec![0, 1, 2, 3, 4, 5]);
}
