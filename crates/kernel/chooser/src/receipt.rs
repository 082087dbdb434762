//! Receipt post-condition.
//!
//! Runs on every decision before it leaves the pipeline. A failure means the
//! pipeline itself is broken, so [`validate`] never returns one: it breaches.

use assaypilot_ledger::{breach, Covenant, CovenantViolation};

use crate::decision::{Decision, DecisionKind};

/// Enforcement layers allowed to record override provenance.
pub const OVERRIDE_LAYERS: [&str; 4] = ["gate_lock", "noise_gate", "assay_gate", "position_coverage"];

fn incomplete(decision: &Decision, what: &str) -> CovenantViolation {
    CovenantViolation::new(
        Covenant::ReceiptComplete,
        format!(
            "cycle {} decision {} ({}): {what}",
            decision.cycle, decision.decision_id, decision.kind
        ),
    )
}

/// Check a decision's receipt.
pub fn check(decision: &Decision) -> Result<(), CovenantViolation> {
    let receipt = &decision.receipt;

    if receipt.template.trim().is_empty() {
        return Err(incomplete(decision, "missing template"));
    }
    if receipt.trigger.trim().is_empty() {
        return Err(incomplete(decision, "missing trigger"));
    }
    if receipt.regime.trim().is_empty() {
        return Err(incomplete(decision, "missing regime"));
    }
    if receipt.gate_state.is_empty() {
        return Err(incomplete(decision, "missing gate state snapshot"));
    }

    match (&receipt.enforcement_layer, receipt.forced) {
        (None, true) => return Err(incomplete(decision, "forced without enforcement layer")),
        (Some(layer), false) => {
            return Err(incomplete(
                decision,
                &format!("enforcement layer {layer} on an unforced decision"),
            ))
        }
        (Some(layer), true) if layer.trim().is_empty() => {
            return Err(incomplete(decision, "empty enforcement layer"))
        }
        _ => {}
    }

    if receipt.is_override() {
        let layer = receipt.enforcement_layer.as_deref().unwrap_or_default();
        if !OVERRIDE_LAYERS.contains(&layer) {
            return Err(incomplete(
                decision,
                &format!("override provenance under layer '{layer}'"),
            ));
        }
    }

    let explains = receipt.attempted_template.is_some() || receipt.calibration_plan.is_some();
    match decision.kind {
        DecisionKind::Abort | DecisionKind::Refusal if !explains => {
            return Err(CovenantViolation::new(
                Covenant::RefusalExplained,
                format!(
                    "cycle {} {} names neither an attempted template nor a calibration plan",
                    decision.cycle, decision.kind
                ),
            ));
        }
        DecisionKind::Abort | DecisionKind::Refusal => {}
        _ if explains => {
            return Err(incomplete(
                decision,
                "attempted template or calibration plan on an executable decision",
            ));
        }
        _ => {}
    }

    if decision.kind == DecisionKind::Refusal && decision.template.is_some() {
        return Err(incomplete(decision, "refusal chose a template"));
    }
    if decision.kind != DecisionKind::Refusal && decision.template.is_none() {
        return Err(incomplete(decision, "no template chosen"));
    }
    Ok(())
}

/// Check a decision's receipt and halt on failure.
#[track_caller]
pub fn validate(decision: &Decision) {
    if let Err(violation) = check(decision) {
        breach(violation);
    }
}
