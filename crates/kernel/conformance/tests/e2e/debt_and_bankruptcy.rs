//! E2E test: epistemic debt interrupts biology until it is repaid, and a
//! run that cannot repay ends in bankruptcy.

use assaypilot_belief::Observation;
use assaypilot_chooser::{DecisionKind, Template};
use assaypilot_conformance::PlateSimulator;
use assaypilot_ledger::{MemorySink, RecordStream};
use assaypilot_runtime::{AgentLoop, Authorization, RunConfig, RuntimeError};

/// Run until the first biology decision. Returns the next cycle and the
/// observation it will receive.
fn run_to_biology(
    agent: &mut AgentLoop<MemorySink>,
    sim: &PlateSimulator,
) -> (u64, Option<Observation>) {
    let mut pending = None;
    for cycle in 0..40 {
        let report = agent.run_cycle(pending.as_ref(), cycle, 3000).unwrap();
        pending = sim.observe(&report.decision, cycle + 1);
        if report.decision.kind == DecisionKind::Biology {
            return (cycle + 1, pending);
        }
    }
    panic!("biology never reached");
}

#[test]
fn debt_forces_calibration_until_repaid() {
    let mut agent = AgentLoop::new(RunConfig::default(), MemorySink::new()).unwrap();
    let sim = PlateSimulator::default();
    let (mut cycle, mut pending) = run_to_biology(&mut agent, &sim);

    agent.beliefs_mut().record_information_claim(2.5, 0.0).unwrap();
    assert!(agent.beliefs().is_insolvent());

    // Biology readout arrives; nothing is repaid by it.
    let report = agent.run_cycle(pending.as_ref(), cycle, 3000).unwrap();
    assert_eq!(report.repaid_bits, 0.0);
    assert_eq!(report.decision.template, Some(Template::BaselineReplicates));
    assert_eq!(report.decision.receipt.trigger, "debt_repayment");
    assert_eq!(report.decision.receipt.regime, "insolvent");
    assert_eq!(
        report.decision.receipt.enforcement_layer.as_deref(),
        Some("insolvency")
    );
    assert!(report.authorization.is_authorized());
    pending = sim.observe(&report.decision, cycle + 1);
    cycle += 1;

    // 2.5 -> 2.0: still at the hard block.
    let report = agent.run_cycle(pending.as_ref(), cycle, 3000).unwrap();
    assert!((report.repaid_bits - 0.5).abs() < 1e-12);
    assert!(agent.beliefs().is_insolvent());
    assert_eq!(report.decision.receipt.trigger, "debt_repayment");
    pending = sim.observe(&report.decision, cycle + 1);
    cycle += 1;

    // 2.0 -> 1.5: solvent again, biology resumes.
    let report = agent.run_cycle(pending.as_ref(), cycle, 3000).unwrap();
    assert!((agent.beliefs().debt_bits() - 1.5).abs() < 1e-12);
    assert!(!agent.beliefs().is_insolvent());
    assert_eq!(report.decision.kind, DecisionKind::Biology);
    assert!(report
        .events
        .iter()
        .any(|e| e.belief == "insolvent" && e.new.as_bool() == Some(false)));
    assert!(agent.enforcement().violations().is_empty());
}

#[test]
fn unaffordable_repayment_refuses_then_goes_bankrupt() {
    let mut agent = AgentLoop::new(RunConfig::default(), MemorySink::new()).unwrap();
    agent.beliefs_mut().record_information_claim(2.5, 0.0).unwrap();

    for cycle in 0..3 {
        let report = agent.run_cycle(None, cycle, 5).unwrap();
        assert_eq!(report.decision.kind, DecisionKind::Refusal);
        assert_eq!(report.decision.template, None);
        assert_eq!(report.decision.receipt.template, "refuse");
        assert_eq!(report.decision.receipt.trigger, "insolvent_unaffordable");
        assert_eq!(report.authorization, Authorization::NotExecutable);
        let plan = report.decision.receipt.calibration_plan.as_ref().unwrap();
        assert_eq!(plan.template, Template::BaselineReplicates);
        assert_eq!(agent.beliefs().consecutive_refusals(), cycle + 1);
    }

    let report = agent.run_cycle(None, 3, 5).unwrap();
    assert_eq!(report.decision.kind, DecisionKind::Abort);
    assert_eq!(report.decision.template, Some(Template::Abort));
    assert_eq!(report.decision.receipt.trigger, "bankruptcy");
    assert_eq!(agent.terminated_at(), Some(3));

    assert!(matches!(
        agent.run_cycle(None, 4, 5000),
        Err(RuntimeError::Terminated(3))
    ));
    assert_eq!(agent.sink().lines(RecordStream::Decisions).len(), 4);
}

#[test]
fn affordable_repayment_interrupts_a_refusal_streak() {
    let mut agent = AgentLoop::new(RunConfig::default(), MemorySink::new()).unwrap();
    agent.beliefs_mut().record_information_claim(2.5, 0.0).unwrap();

    agent.run_cycle(None, 0, 5).unwrap();
    agent.run_cycle(None, 1, 5).unwrap();
    assert_eq!(agent.beliefs().consecutive_refusals(), 2);

    let report = agent.run_cycle(None, 2, 500).unwrap();
    assert_eq!(report.decision.kind, DecisionKind::Calibration);
    assert_eq!(agent.beliefs().consecutive_refusals(), 0);
    assert_eq!(agent.terminated_at(), None);
}
