//! E2E test: a full run from an empty belief state to exploration.
//!
//! The agent loop is driven against the plate simulator. Calibration comes
//! first in a fixed order (first plate, edge test, baseline replicates, then
//! the assay ladder); biology starts only after every mandatory gate is
//! earned, and the run ends by proposing a wider library.

use assaypilot_belief::{AssayKind, BeliefState, GateAxis, Observation, Position};
use assaypilot_chooser::{
    receipt, ActionClass, Chooser, ChooserConfig, Decision, DecisionKind, Template,
};
use assaypilot_conformance::fixtures::dmso;
use assaypilot_conformance::PlateSimulator;
use assaypilot_ledger::MemorySink;
use assaypilot_runtime::{AgentLoop, RunConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Run {
    agent: AgentLoop<MemorySink>,
    decisions: Vec<Decision>,
    budget: u32,
}

/// Drive the loop until a proposal or `max_cycles`.
fn run(budget: u32, max_cycles: u64) -> Run {
    let mut agent = AgentLoop::new(RunConfig::default(), MemorySink::new()).unwrap();
    let sim = PlateSimulator::default();
    let mut budget = budget;
    let mut pending: Option<Observation> = None;
    let mut decisions = Vec::new();

    for cycle in 0..max_cycles {
        let report = agent.run_cycle(pending.as_ref(), cycle, budget).unwrap();
        assert!(report.authorization.is_authorized(), "cycle {cycle}: {:?}", report.authorization);
        budget -= report.decision.wells_requested;
        pending = sim.observe(&report.decision, cycle + 1);
        let done = report.decision.kind == DecisionKind::Proposal;
        decisions.push(report.decision);
        if done {
            break;
        }
    }
    Run {
        agent,
        decisions,
        budget,
    }
}

fn position_of(decisions: &[Decision], template: Template) -> usize {
    decisions
        .iter()
        .position(|d| d.template == Some(template))
        .unwrap_or_else(|| panic!("{template} never chosen"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn run_reaches_exploration_proposal() {
    let run = run(3000, 60);
    let last = run.decisions.last().unwrap();
    assert_eq!(last.template, Some(Template::ProposeLibraryExpansion));
    assert_eq!(last.receipt.trigger, "exploration_exhausted");
    assert_eq!(last.wells_requested, 0);
    assert!(run.budget > 0);
}

#[test]
fn calibration_order_is_fixed() {
    let run = run(3000, 60);
    let d = &run.decisions;

    assert_eq!(d[0].template, Some(Template::Cycle0FullPlate));
    assert_eq!(d[1].template, Some(Template::EdgeCenterTest));

    let first_baseline = position_of(d, Template::BaselineReplicates);
    let ldh = position_of(d, Template::CalibrateLdhBaseline);
    let paint = position_of(d, Template::CalibrateCellPaintBaseline);
    let biology = d
        .iter()
        .position(|x| x.kind == DecisionKind::Biology)
        .unwrap();

    assert!(first_baseline < ldh);
    assert!(ldh < paint);
    assert!(paint < biology);
    assert!(!d.iter().any(|x| x.template == Some(Template::CalibrateScrnaBaseline)));

    // Everything before biology was forced calibration.
    for decision in &d[..biology] {
        assert_eq!(decision.kind, DecisionKind::Calibration);
        assert!(decision.receipt.forced, "cycle {}", decision.cycle);
    }
}

#[test]
fn biology_runs_only_with_every_gate_earned() {
    let run = run(3000, 60);
    for decision in run.decisions.iter().filter(|d| d.kind == DecisionKind::Biology) {
        assert!(!decision.receipt.forced);
        assert_eq!(decision.receipt.enforcement_layer, None);
        assert_eq!(decision.receipt.regime, "in_gate");
        for axis in ["noise_sigma", "ldh", "cell_paint"] {
            assert_eq!(decision.receipt.gate_state[axis], "earned", "{axis}");
        }
    }

    let beliefs = run.agent.beliefs();
    assert!(beliefs.is_earned(GateAxis::Noise));
    assert!(beliefs.is_earned(GateAxis::Ldh));
    assert!(beliefs.is_earned(GateAxis::CellPaint));
    assert!(!beliefs.is_earned(GateAxis::Scrna));
}

#[test]
fn every_compound_gets_a_dose_ladder_then_a_time_course() {
    let run = run(3000, 60);
    let biology: Vec<&Decision> = run
        .decisions
        .iter()
        .filter(|d| d.action_class() == Some(ActionClass::Biology))
        .collect();

    let library = &run.agent.config().chooser.compound_library;
    assert_eq!(biology.len(), library.len() + 1);
    for (decision, compound) in biology.iter().zip(library) {
        assert_eq!(decision.template, Some(Template::DoseLadderCoarse));
        assert_eq!(decision.parameters["compound"], compound.as_str());
        assert_eq!(decision.receipt.trigger, "untested_compound");
    }

    let course = biology.last().unwrap();
    assert_eq!(course.template, Some(Template::TimeCourse));
    assert_eq!(course.receipt.trigger, "time_dependence_unobserved");
    assert!(run.agent.beliefs().response().time_dependence_seen);
}

#[test]
fn every_receipt_is_complete_and_cycles_increase() {
    let run = run(3000, 60);
    for decision in &run.decisions {
        assert!(receipt::check(decision).is_ok(), "cycle {}", decision.cycle);
        assert!(!decision.fingerprint.is_empty());
    }
    let records = run.agent.chooser().log().records();
    assert_eq!(records.len(), run.decisions.len());
    assert!(records.windows(2).all(|w| w[0].cycle < w[1].cycle));
}

#[test]
fn budget_is_read_not_spent_by_the_kernel() {
    let run = run(3000, 60);
    let requested: u32 = run.decisions.iter().map(|d| d.wells_requested).sum();
    assert_eq!(run.budget, 3000 - requested);
}

#[test]
fn center_heavy_calibration_is_rebalanced_in_one_batch() {
    let mut beliefs = BeliefState::new();
    for cycle in 0..8 {
        let conditions = [AssayKind::Viability, AssayKind::Ldh, AssayKind::CellPainting]
            .into_iter()
            .map(|assay| dmso(assay, Position::Center, 100, 0.1))
            .collect();
        beliefs.update(&Observation::new(cycle, conditions)).unwrap();
    }
    assert!(beliefs.is_earned(GateAxis::CellPaint));
    assert_eq!(beliefs.exploration().calibration_wells_at("edge"), 0);

    let mut chooser = Chooser::standard(ChooserConfig::default());
    let sim = PlateSimulator::default();
    let mut coverage_batches = 0;
    let mut biology_at = None;
    for cycle in 8..12 {
        let decision = chooser.choose_next(&mut beliefs, 5000, cycle, false).unwrap();
        if decision.kind == DecisionKind::Biology {
            biology_at = Some(cycle);
            break;
        }
        assert_eq!(decision.receipt.trigger, "position_coverage_gap");
        coverage_batches += 1;
        let obs = sim.observe(&decision, cycle + 1).unwrap();
        beliefs.update(&obs).unwrap();
    }

    assert_eq!(coverage_batches, 1);
    assert_eq!(biology_at, Some(9));
}
