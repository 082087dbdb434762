//! Epistemic debt: the gap between information an action claimed it would
//! yield and what it delivered.

use assaypilot_ledger::FieldValue;
use tracing::{info, warn};

use crate::error::BeliefError;
use crate::field::BeliefField;
use crate::state::{BeliefState, EvidenceTimes, Support};

fn check_bits(what: &'static str, bits: f64) -> Result<(), BeliefError> {
    if bits.is_finite() && bits >= 0.0 {
        Ok(())
    } else {
        Err(BeliefError::InvalidBits { what, bits })
    }
}

impl BeliefState {
    pub fn debt_bits(&self) -> f64 {
        self.insolvency.debt_bits
    }

    /// Debt at or above the hard-block threshold.
    pub fn is_insolvent(&self) -> bool {
        self.insolvency.debt_bits >= self.debt_policy().hard_block_bits
    }

    pub fn consecutive_refusals(&self) -> u64 {
        self.insolvency.consecutive_refusals
    }

    /// Refused often enough in a row that the run must end.
    pub fn is_bankrupt(&self) -> bool {
        self.insolvency.consecutive_refusals >= self.debt_policy().max_consecutive_refusals
    }

    /// Add the shortfall `claimed − realized` (if positive) to the debt.
    /// Returns the new debt.
    pub fn record_information_claim(
        &mut self,
        claimed_bits: f64,
        realized_bits: f64,
    ) -> Result<f64, BeliefError> {
        check_bits("claimed information", claimed_bits)?;
        check_bits("realized information", realized_bits)?;
        let shortfall = (claimed_bits - realized_bits).max(0.0);
        if shortfall == 0.0 {
            return Ok(self.debt_bits());
        }
        let debt = self.debt_bits() + shortfall;
        self.set_debt(
            debt,
            Support::new()
                .metric("claimed_bits", claimed_bits)
                .metric("realized_bits", realized_bits)
                .metric("shortfall_bits", shortfall)
                .note("information_claim"),
        )?;
        Ok(debt)
    }

    /// Pay debt down, not below zero. Returns the new debt.
    pub fn repay_debt(&mut self, bits: f64) -> Result<f64, BeliefError> {
        check_bits("repayment", bits)?;
        let debt = (self.debt_bits() - bits).max(0.0);
        self.set_debt(
            debt,
            Support::new().metric("repaid_bits", bits).note("calibration_repayment"),
        )?;
        Ok(debt)
    }

    fn set_debt(&mut self, debt: f64, support: Support) -> Result<(), BeliefError> {
        let was_insolvent = self.insolvency.insolvent;
        self.set(
            BeliefField::DebtBits,
            FieldValue::Real(debt),
            support.clone(),
            EvidenceTimes::default(),
        )?;
        let insolvent = self.is_insolvent();
        self.set(
            BeliefField::Insolvent,
            FieldValue::Bool(insolvent),
            support.metric("threshold_bits", self.debt_policy().hard_block_bits),
            EvidenceTimes::default(),
        )?;
        match (was_insolvent, insolvent) {
            (false, true) => warn!(debt_bits = debt, "Epistemic debt over hard-block threshold"),
            (true, false) => info!(debt_bits = debt, "Epistemic debt back under threshold"),
            _ => {}
        }
        Ok(())
    }

    /// Count a refusal. Returns the number of refusals in a row.
    pub fn record_refusal(&mut self, reason: &str) -> Result<u64, BeliefError> {
        let refusals = self.insolvency.consecutive_refusals + 1;
        let support = Support::new()
            .metric("debt_bits", self.debt_bits())
            .note("refusal");
        self.set(
            BeliefField::ConsecutiveRefusals,
            FieldValue::Count(refusals),
            support.clone(),
            EvidenceTimes::default(),
        )?;
        self.set(
            BeliefField::LastRefusalReason,
            FieldValue::Text(reason.to_string()),
            support,
            EvidenceTimes::default(),
        )?;
        Ok(refusals)
    }

    /// Reset the refusal streak after an executed action.
    pub fn clear_refusals(&mut self) -> Result<(), BeliefError> {
        self.set(
            BeliefField::ConsecutiveRefusals,
            FieldValue::Count(0),
            Support::new().note("action_executed"),
            EvidenceTimes::default(),
        )?;
        Ok(())
    }
}
