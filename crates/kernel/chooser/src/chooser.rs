use assaypilot_belief::BeliefState;
use assaypilot_ledger::DecisionLog;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ChooserConfig;
use crate::context::{ChooserContext, DecisionDraft, StageResult};
use crate::decision::{fingerprint, Decision, DecisionKind, FingerprintInputs};
use crate::error::ChooserError;
use crate::receipt;
use crate::sizing::AmortizedBatchSizing;
use crate::stages::standard_pipeline;
use crate::traits::{BatchSizingPolicy, PolicyStage};

/// The decision pipeline.
///
/// Produces exactly one [`Decision`] per cycle and keeps the append-only
/// decision log. Invariants:
/// - stages run in canonical order and the first decision wins
/// - every decision passes [`receipt::validate`] before it is returned
/// - cycle ids in the log strictly increase
/// - the well budget is read, never written
pub struct Chooser {
    stages: Vec<Box<dyn PolicyStage>>,
    config: ChooserConfig,
    sizing: Box<dyn BatchSizingPolicy>,
    log: DecisionLog,
}

impl std::fmt::Debug for Chooser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chooser")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.stage_name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .field("decisions", &self.log.len())
            .finish()
    }
}

impl Chooser {
    /// The six standard stages with amortized batch sizing.
    pub fn standard(config: ChooserConfig) -> Self {
        Self {
            stages: standard_pipeline(),
            config,
            sizing: Box::new(AmortizedBatchSizing),
            log: DecisionLog::new(),
        }
    }

    /// Build a pipeline from explicit stages.
    ///
    /// Fails unless the stages are numbered 1 through 6 in order.
    pub fn new(
        config: ChooserConfig,
        sizing: Box<dyn BatchSizingPolicy>,
        stages: Vec<Box<dyn PolicyStage>>,
    ) -> Result<Self, ChooserError> {
        let numbers: Vec<u8> = stages.iter().map(|s| s.stage_number()).collect();
        if numbers != [1, 2, 3, 4, 5, 6] {
            return Err(ChooserError::PipelineMisconfigured(format!(
                "stages must be numbered 1..=6 in order, got {numbers:?}"
            )));
        }
        Ok(Self {
            stages,
            config,
            sizing,
            log: DecisionLog::new(),
        })
    }

    pub fn config(&self) -> &ChooserConfig {
        &self.config
    }

    /// Decisions made so far.
    pub fn log(&self) -> &DecisionLog {
        &self.log
    }

    /// Check that `cycle` may still be decided, without deciding it.
    pub fn ensure_next(&self, cycle: u64) -> Result<(), ChooserError> {
        self.log.ensure_next(cycle)?;
        Ok(())
    }

    /// Choose the action for `cycle`.
    ///
    /// Policy and affordability failures come back as abort or refusal
    /// decisions, not errors. A decision that fails receipt validation halts
    /// the process.
    pub fn choose_next(
        &mut self,
        beliefs: &mut BeliefState,
        budget_remaining_wells: u32,
        cycle: u64,
        allow_expensive_calibration: bool,
    ) -> Result<Decision, ChooserError> {
        self.log.ensure_next(cycle)?;
        beliefs.enter_cycle(cycle)?;

        let draft = {
            let mut context = ChooserContext::new(
                beliefs,
                &self.config,
                self.sizing.as_ref(),
                budget_remaining_wells,
                cycle,
                allow_expensive_calibration,
            );
            Self::run_stages(&self.stages, &mut context)?
        };

        let decision = Self::finalize(
            draft,
            beliefs,
            cycle,
            budget_remaining_wells,
            allow_expensive_calibration,
        )?;
        receipt::validate(&decision);

        match decision.kind {
            DecisionKind::Refusal => {
                let refusals = beliefs.record_refusal(&decision.receipt.trigger)?;
                warn!(cycle, refusals, reason = %decision.rationale.summary, "Refused");
            }
            DecisionKind::Abort => {
                warn!(
                    cycle,
                    trigger = %decision.receipt.trigger,
                    reason = %decision.rationale.summary,
                    "Aborting run"
                );
            }
            _ => {
                beliefs.clear_refusals()?;
                info!(
                    cycle,
                    kind = %decision.kind,
                    template = %decision.receipt.template,
                    wells = decision.wells_requested,
                    forced = decision.receipt.forced,
                    "Decision made"
                );
            }
        }

        self.log.append(decision.to_record())?;
        Ok(decision)
    }

    fn run_stages(
        stages: &[Box<dyn PolicyStage>],
        context: &mut ChooserContext<'_>,
    ) -> Result<DecisionDraft, ChooserError> {
        for stage in stages {
            debug!(
                stage = stage.stage_name(),
                number = stage.stage_number(),
                "Evaluating stage"
            );
            let result = stage.evaluate(context)?;
            context.record_stage(stage.stage_name(), &result);

            match result {
                StageResult::Continue => {
                    debug!(stage = stage.stage_name(), "Stage passed");
                }
                StageResult::Decide(draft) => {
                    debug!(
                        stage = stage.stage_name(),
                        kind = %draft.kind,
                        template = %draft.receipt.template,
                        "Stage decided"
                    );
                    return Ok(draft);
                }
            }
        }
        Err(ChooserError::NoDecision(context.cycle))
    }

    fn finalize(
        draft: DecisionDraft,
        beliefs: &BeliefState,
        cycle: u64,
        budget_remaining_wells: u32,
        allow_expensive_calibration: bool,
    ) -> Result<Decision, ChooserError> {
        let fingerprint = fingerprint(&FingerprintInputs {
            cycle,
            budget_remaining_wells,
            allow_expensive_calibration,
            gate_state: &draft.receipt.gate_state,
            noise_df: beliefs.noise().df,
            noise_rel_width: beliefs.noise().rel_width,
            debt_bits: beliefs.debt_bits(),
            kind: draft.kind,
            template: draft.template,
            parameters: &draft.parameters,
            wells_requested: draft.wells,
        })?;
        Ok(Decision {
            decision_id: Uuid::new_v4().to_string(),
            cycle,
            timestamp: Utc::now(),
            kind: draft.kind,
            template: draft.template,
            parameters: draft.parameters,
            wells_requested: draft.wells,
            rationale: draft.rationale,
            receipt: draft.receipt,
            fingerprint,
        })
    }
}
