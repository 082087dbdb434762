use assaypilot_belief::{BeliefState, Observation};
use assaypilot_chooser::{Chooser, ChooserError, DebtEnforcer, Decision, EnforcementContext};
use assaypilot_ledger::{EvidenceEvent, NoiseDiagnostics, RecordSink};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::RuntimeError;

/// Outcome of authorizing a decision for execution.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Authorization {
    /// The caller may execute the decision.
    Authorized,
    /// Blocked by epistemic debt; counted as a refusal.
    DebtBlocked { debt_bits: f64, threshold: f64 },
    /// Refusals and aborts describe no action.
    NotExecutable,
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized)
    }
}

/// Everything one cycle produced.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle: u64,
    pub decision: Decision,
    pub authorization: Authorization,
    /// Belief changes of the cycle, in mutation order.
    pub events: Vec<EvidenceEvent>,
    pub diagnostics: Option<NoiseDiagnostics>,
    /// Debt repaid by a calibration-only observation.
    pub repaid_bits: f64,
}

/// The top-level run loop.
///
/// Single writer of the belief state. The well budget stays with the caller:
/// each cycle reads it and reports the wells the decision would consume.
pub struct AgentLoop<S: RecordSink> {
    config: RunConfig,
    beliefs: BeliefState,
    chooser: Chooser,
    enforcer: DebtEnforcer,
    enforcement: EnforcementContext,
    sink: S,
    terminated_at: Option<u64>,
}

impl<S: RecordSink> AgentLoop<S> {
    pub fn new(config: RunConfig, sink: S) -> Result<Self, RuntimeError> {
        let chooser = Chooser::standard(config.chooser.clone());
        Self::with_chooser(config, chooser, sink)
    }

    /// Run with a custom decision pipeline.
    pub fn with_chooser(config: RunConfig, chooser: Chooser, sink: S) -> Result<Self, RuntimeError> {
        config.validate()?;
        let beliefs = BeliefState::with_policy(config.gate.clone(), config.debt.clone());
        info!(
            allow_expensive_calibration = config.allow_expensive_calibration,
            "Agent loop ready"
        );
        Ok(Self {
            config,
            beliefs,
            chooser,
            enforcer: DebtEnforcer,
            enforcement: EnforcementContext::new(),
            sink,
            terminated_at: None,
        })
    }

    pub fn beliefs(&self) -> &BeliefState {
        &self.beliefs
    }

    /// Mutable access for callers that book information claims.
    pub fn beliefs_mut(&mut self) -> &mut BeliefState {
        &mut self.beliefs
    }

    pub fn chooser(&self) -> &Chooser {
        &self.chooser
    }

    pub fn enforcement(&self) -> &EnforcementContext {
        &self.enforcement
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Cycle at which the run ended with an abort, if it has.
    pub fn terminated_at(&self) -> Option<u64> {
        self.terminated_at
    }

    /// Run one cycle: fold in `observation` (the result of the previous
    /// decision), choose, authorize and flush the record streams.
    ///
    /// Belief changes reach the sink as soon as they are applied, so a cycle
    /// that fails after its update still leaves the update on record.
    pub fn run_cycle(
        &mut self,
        observation: Option<&Observation>,
        cycle: u64,
        budget_remaining_wells: u32,
    ) -> Result<CycleReport, RuntimeError> {
        if let Some(at) = self.terminated_at {
            return Err(RuntimeError::Terminated(at));
        }
        self.chooser.ensure_next(cycle)?;

        let mut events = Vec::new();
        let mut diagnostics = None;
        let mut repaid_bits = 0.0;

        if let Some(observation) = observation {
            if observation.cycle != cycle {
                return Err(RuntimeError::CycleMismatch {
                    expected: cycle,
                    got: observation.cycle,
                });
            }
            let (update_events, diag) = self.beliefs.update(observation)?;
            self.flush_events(&update_events)?;
            self.sink.noise_diagnostics(&diag)?;
            events.extend(update_events);
            diagnostics = Some(diag);

            if observation.is_calibration_only() && self.beliefs.debt_bits() > 0.0 {
                let before = self.beliefs.debt_bits();
                let after = self.beliefs.repay_debt(self.config.debt_repayment_bits)?;
                repaid_bits = before - after;
                let repayment = self.beliefs.drain_events();
                self.flush_events(&repayment)?;
                events.extend(repayment);
            }
        }
        let flushed = events.len();

        let decision = self.chooser.choose_next(
            &mut self.beliefs,
            budget_remaining_wells,
            cycle,
            self.config.allow_expensive_calibration,
        )?;

        let authorization = if decision.is_executable() {
            match self
                .enforcer
                .authorize(&decision, &mut self.beliefs, &mut self.enforcement)
            {
                Ok(()) => Authorization::Authorized,
                Err(ChooserError::DebtBlocked {
                    debt_bits,
                    threshold,
                    ..
                }) => Authorization::DebtBlocked {
                    debt_bits,
                    threshold,
                },
                Err(e) => return Err(e.into()),
            }
        } else {
            Authorization::NotExecutable
        };

        if decision.is_terminal() {
            warn!(cycle, summary = %decision.rationale.summary, "Run terminated");
            self.terminated_at = Some(cycle);
        }

        events.extend(self.beliefs.drain_events());
        self.flush_events(&events[flushed..])?;
        self.sink.decision(&decision.to_record())?;

        info!(
            cycle,
            kind = %decision.kind,
            template = %decision.receipt.template,
            authorized = authorization.is_authorized(),
            events = events.len(),
            "Cycle complete"
        );

        Ok(CycleReport {
            cycle,
            decision,
            authorization,
            events,
            diagnostics,
            repaid_bits,
        })
    }

    fn flush_events(&mut self, events: &[EvidenceEvent]) -> Result<(), RuntimeError> {
        for event in events {
            self.sink.belief_change(event)?;
        }
        Ok(())
    }
}
