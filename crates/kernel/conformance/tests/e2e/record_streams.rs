//! E2E test: the three audit streams are written one JSON object per line
//! and agree with each other.

use assaypilot_conformance::fixtures::full_plate;
use assaypilot_ledger::{MemorySink, RecordStream};
use assaypilot_runtime::{AgentLoop, RunConfig};
use serde_json::Value;

fn parse(lines: &[String]) -> Vec<Value> {
    lines
        .iter()
        .map(|line| {
            assert!(!line.contains('\n'));
            serde_json::from_str(line).unwrap()
        })
        .collect()
}

#[test]
fn streams_cover_every_cycle() {
    let mut agent = AgentLoop::new(RunConfig::default(), MemorySink::new()).unwrap();
    agent.run_cycle(None, 0, 1000).unwrap();
    agent.run_cycle(Some(&full_plate(1, 0.1)), 1, 904).unwrap();

    let decisions = parse(agent.sink().lines(RecordStream::Decisions));
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0]["cycle"], 0);
    assert_eq!(decisions[0]["receipt_template"], "cycle0_full_plate");
    assert_eq!(decisions[0]["enforcement_layer"], "cycle0");
    assert_eq!(decisions[1]["cycle"], 1);
    assert_eq!(decisions[1]["receipt_template"], "edge_center_test");
    assert_eq!(decisions[1]["gate_state"]["noise_sigma"], "undetermined");
    assert_eq!(decisions[1]["fingerprint"].as_str().unwrap().len(), 64);

    let diagnostics = parse(agent.sink().lines(RecordStream::NoiseDiagnostics));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["cycle"], 1);
    assert_eq!(diagnostics[0]["df_total"], 94);
    assert_eq!(diagnostics[0]["conditions_used"], 2);
    assert_eq!(diagnostics[0]["stable"], false);
}

#[test]
fn belief_changes_are_ordered_and_declared() {
    let mut agent = AgentLoop::new(RunConfig::default(), MemorySink::new()).unwrap();
    agent.run_cycle(None, 0, 1000).unwrap();
    let report = agent.run_cycle(Some(&full_plate(1, 0.1)), 1, 904).unwrap();

    let changes = parse(agent.sink().lines(RecordStream::BeliefChanges));
    assert_eq!(changes.len(), report.events.len());
    assert!(changes.iter().all(|c| c["cycle"] == 1));

    let fields: Vec<&str> = changes.iter().filter_map(|c| c["belief"].as_str()).collect();
    for field in ["noise_sse", "noise_df", "noise_sigma_hat", "noise_rel_width", "edge_tests_run"] {
        assert!(fields.contains(&field), "{field} not declared");
    }
    let df = changes.iter().find(|c| c["belief"] == "noise_df").unwrap();
    assert!(!df["supporting_conditions"].as_array().unwrap().is_empty());
}
