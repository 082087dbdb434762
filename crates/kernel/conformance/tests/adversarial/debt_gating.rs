//! Adversarial test: non-calibration actions cannot run on credit, and the
//! decision log cannot be rewritten.

use assaypilot_belief::{AssayKind, BeliefError, BeliefState, Observation};
use assaypilot_chooser::{
    Chooser, ChooserConfig, ChooserError, DebtEnforcer, DecisionKind, EnforcementContext,
    Template,
};
use assaypilot_conformance::fixtures::{full_plate, vehicle_plate};
use assaypilot_ledger::LedgerError;

const CHEAP: [AssayKind; 3] = [AssayKind::Viability, AssayKind::Ldh, AssayKind::CellPainting];

fn ready_for_biology() -> BeliefState {
    let mut beliefs = BeliefState::new();
    for cycle in 0..3 {
        beliefs.update(&vehicle_plate(cycle, &CHEAP, 100, 0.1)).unwrap();
    }
    beliefs
}

// ---------------------------------------------------------------------------
// Tests: Debt enforcement
// ---------------------------------------------------------------------------

#[test]
fn debt_booked_after_the_choice_blocks_execution() {
    let mut beliefs = ready_for_biology();
    let mut chooser = Chooser::standard(ChooserConfig::default());
    let decision = chooser.choose_next(&mut beliefs, 2000, 3, false).unwrap();
    assert_eq!(decision.kind, DecisionKind::Biology);

    beliefs.record_information_claim(2.5, 0.0).unwrap();
    let mut context = EnforcementContext::new();
    let err = DebtEnforcer
        .authorize(&decision, &mut beliefs, &mut context)
        .unwrap_err();

    match err {
        ChooserError::DebtBlocked {
            template,
            debt_bits,
            threshold,
        } => {
            assert_eq!(template, "dose_ladder_coarse");
            assert!((debt_bits - 2.5).abs() < 1e-12);
            assert!((threshold - 2.0).abs() < 1e-12);
        }
        other => panic!("expected a debt block, got {other}"),
    }
    assert_eq!(context.violations().len(), 1);
    assert_eq!(context.violations()[0].decision_id, decision.decision_id);
    assert_eq!(beliefs.consecutive_refusals(), 1);
}

#[test]
fn insolvent_chooser_only_offers_calibration() {
    let mut beliefs = ready_for_biology();
    beliefs.record_information_claim(2.5, 0.0).unwrap();
    let mut chooser = Chooser::standard(ChooserConfig::default());

    let decision = chooser.choose_next(&mut beliefs, 2000, 3, false).unwrap();
    assert_eq!(decision.kind, DecisionKind::Calibration);
    assert_eq!(decision.template, Some(Template::BaselineReplicates));
    assert_eq!(decision.receipt.regime, "insolvent");

    let mut context = EnforcementContext::new();
    assert!(DebtEnforcer.authorize(&decision, &mut beliefs, &mut context).is_ok());
    assert!(context.violations().is_empty());
}

#[test]
fn debt_just_under_the_block_allows_biology() {
    let mut beliefs = ready_for_biology();
    beliefs.record_information_claim(1.99, 0.0).unwrap();
    let mut chooser = Chooser::standard(ChooserConfig::default());

    let decision = chooser.choose_next(&mut beliefs, 2000, 3, false).unwrap();
    assert_eq!(decision.kind, DecisionKind::Biology);
    let mut context = EnforcementContext::new();
    assert!(DebtEnforcer.authorize(&decision, &mut beliefs, &mut context).is_ok());
}

#[test]
fn negative_or_non_finite_claims_are_rejected() {
    let mut beliefs = BeliefState::new();
    for bits in [-1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            beliefs.record_information_claim(bits, 0.0),
            Err(BeliefError::InvalidBits { .. })
        ));
    }
    assert_eq!(beliefs.debt_bits(), 0.0);
    // Over-delivery never creates credit.
    beliefs.record_information_claim(1.0, 3.0).unwrap();
    assert_eq!(beliefs.debt_bits(), 0.0);
}

// ---------------------------------------------------------------------------
// Tests: Ordering
// ---------------------------------------------------------------------------

#[test]
fn second_decision_for_a_cycle_is_rejected() {
    let mut beliefs = BeliefState::new();
    let mut chooser = Chooser::standard(ChooserConfig::default());
    chooser.choose_next(&mut beliefs, 1000, 0, false).unwrap();
    chooser.choose_next(&mut beliefs, 1000, 1, false).unwrap();

    for cycle in [0, 1] {
        let err = chooser.choose_next(&mut beliefs, 1000, cycle, false).unwrap_err();
        assert!(matches!(
            err,
            ChooserError::Ledger(LedgerError::DuplicateDecision(_))
                | ChooserError::Ledger(LedgerError::OutOfOrderDecision { .. })
        ));
    }
    assert_eq!(chooser.log().len(), 2);
}

#[test]
fn observation_from_the_past_is_rejected() {
    let mut beliefs = BeliefState::new();
    beliefs.update(&full_plate(2, 0.1)).unwrap();
    let stale = beliefs.update(&full_plate(1, 0.1)).unwrap_err();
    assert!(matches!(stale, BeliefError::Ledger(_)));
    assert_eq!(beliefs.noise().df, 94);
}

#[test]
fn malformed_summaries_change_nothing() {
    let mut beliefs = BeliefState::new();
    let mut obs = full_plate(0, 0.1);
    obs.conditions[1].std = f64::NAN;
    assert!(matches!(
        beliefs.update(&obs),
        Err(BeliefError::InvalidObservation(_))
    ));
    assert_eq!(beliefs.noise().df, 0);

    let empty = Observation::new(0, vec![]);
    let (events, diag) = beliefs.update(&empty).unwrap();
    assert!(events.is_empty());
    assert_eq!(diag.df_delta, 0);
}
