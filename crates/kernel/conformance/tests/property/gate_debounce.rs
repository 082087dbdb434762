//! Property tests: the gate state machine debounces entry and exits
//! immediately, with hysteresis between the two thresholds.

use assaypilot_belief::{step, GatePolicy, GateReading, GateState, GateStatus, GateTransition};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_reading() -> impl Strategy<Value = GateReading> {
    (
        prop_oneof![Just(10u64), 40u64..400],
        0.05f64..0.6,
        prop::option::of(0.0f64..0.4),
    )
        .prop_map(|(df, rel_width, drift)| GateReading {
            df,
            rel_width: Some(rel_width),
            drift,
            prerequisite_earned: true,
        })
}

fn qualifies(policy: &GatePolicy, reading: &GateReading) -> bool {
    reading.df >= policy.df_floor
        && reading.rel_width.is_some_and(|w| w <= policy.enter_rel_width)
        && !reading.drift.is_some_and(|d| d >= policy.drift_threshold)
}

fn exits(policy: &GatePolicy, reading: &GateReading) -> bool {
    reading.rel_width.is_some_and(|w| w >= policy.exit_rel_width)
        || reading.drift.is_some_and(|d| d >= policy.drift_threshold)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Entry happens exactly when the run of qualifying readings reaches
    /// the required streak; exit happens exactly when a reading crosses an
    /// exit condition.
    #[test]
    fn state_machine_matches_a_reference_run(
        readings in prop::collection::vec(arb_reading(), 1..40),
        streak_required in 1u32..5,
    ) {
        let policy = GatePolicy::default();
        let mut status = GateStatus::default();
        let mut run = 0u32;

        for reading in &readings {
            let was_earned = status.state.is_earned();
            let (next, transition) = step(&policy, status, reading, streak_required);

            if was_earned {
                if exits(&policy, reading) {
                    prop_assert_eq!(next.state, GateState::Revoked);
                    prop_assert!(matches!(transition, GateTransition::Revoked(_)));
                    run = 0;
                } else {
                    prop_assert_eq!(transition, GateTransition::Held);
                    prop_assert_eq!(next, status);
                }
            } else if qualifies(&policy, reading) {
                run += 1;
                prop_assert_eq!(next.streak, run);
                prop_assert_eq!(next.state.is_earned(), run >= streak_required);
            } else {
                run = 0;
                prop_assert_eq!(next.streak, 0);
                prop_assert!(!next.state.is_earned());
            }
            status = next;
        }
    }

    /// A revoked gate needs a fresh full streak before it is earned again.
    #[test]
    fn revocation_restarts_the_streak(
        good_width in 0.05f64..0.25,
        streak_required in 2u32..5,
    ) {
        let policy = GatePolicy::default();
        let good = GateReading { df: 200, rel_width: Some(good_width), drift: None, prerequisite_earned: true };
        let bad = GateReading { rel_width: Some(policy.exit_rel_width), ..good };

        let mut status = GateStatus { state: GateState::Earned, streak: streak_required };
        status = step(&policy, status, &bad, streak_required).0;
        prop_assert_eq!(status.state, GateState::Revoked);

        for i in 1..streak_required {
            status = step(&policy, status, &good, streak_required).0;
            prop_assert_eq!(status.state, GateState::Revoked, "reading {}", i);
        }
        status = step(&policy, status, &good, streak_required).0;
        prop_assert_eq!(status.state, GateState::Earned);
    }

    /// Without the prerequisite, no amount of good evidence earns the gate.
    #[test]
    fn blocked_gate_never_earns(count in 1usize..20, width in 0.05f64..0.25) {
        let policy = GatePolicy::default();
        let reading = GateReading { df: 500, rel_width: Some(width), drift: None, prerequisite_earned: false };
        let mut status = GateStatus::default();
        for _ in 0..count {
            let (next, transition) = step(&policy, status, &reading, 1);
            prop_assert_eq!(transition, GateTransition::Blocked);
            status = next;
        }
        prop_assert_eq!(status.state, GateState::Undetermined);
    }
}
