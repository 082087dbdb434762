use std::collections::BTreeSet;

use tracing::debug;

use crate::error::LedgerError;
use crate::event::{EvidenceEvent, GateMarker};
use crate::records::DecisionRecord;

/// Per-cycle accumulator of evidence events.
///
/// Events are appended in the order their mutations happen and drained
/// atomically. Cycle ids never regress; an event can only be appended for the
/// cycle the ledger is currently in.
#[derive(Clone, Debug, Default)]
pub struct EvidenceLedger {
    cycle: u64,
    opened: bool,
    pending: Vec<EvidenceEvent>,
    drained_total: u64,
}

impl EvidenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cycle id.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Move the ledger to `cycle`. Re-entering the current cycle is a no-op.
    pub fn begin_cycle(&mut self, cycle: u64) -> Result<(), LedgerError> {
        if self.opened && cycle < self.cycle {
            return Err(LedgerError::CycleRegression {
                current: self.cycle,
                requested: cycle,
            });
        }
        if !self.opened || cycle != self.cycle {
            debug!(cycle, pending = self.pending.len(), "Evidence ledger entering cycle");
        }
        self.cycle = cycle;
        self.opened = true;
        Ok(())
    }

    /// Append an event. APPEND-ONLY: pending events are never edited.
    pub fn append(&mut self, event: EvidenceEvent) -> Result<(), LedgerError> {
        if event.cycle != self.cycle {
            return Err(LedgerError::CycleMismatch {
                current: self.cycle,
                event_cycle: event.cycle,
            });
        }
        self.pending.push(event);
        Ok(())
    }

    /// Events appended since the last drain, in mutation order.
    pub fn pending(&self) -> &[EvidenceEvent] {
        &self.pending
    }

    /// Take every pending event.
    pub fn drain(&mut self) -> Vec<EvidenceEvent> {
        self.drained_total += self.pending.len() as u64;
        std::mem::take(&mut self.pending)
    }

    /// Number of events drained over the ledger's lifetime.
    pub fn drained_total(&self) -> u64 {
        self.drained_total
    }

    /// Fields declared by pending events of `cycle`.
    pub fn declared_fields(&self, cycle: u64) -> BTreeSet<&str> {
        self.pending
            .iter()
            .filter(|e| e.cycle == cycle)
            .map(|e| e.belief.as_str())
            .collect()
    }

    /// Whether a pending event of `cycle` declares `field` with a gate marker.
    pub fn has_gate_marker(&self, cycle: u64, field: &str) -> bool {
        self.pending.iter().any(|e| {
            e.cycle == cycle
                && e.declares(field)
                && matches!(e.marker(), Some(GateMarker::Event | GateMarker::Loss))
        })
    }
}

/// Decision log: append-only, exactly one record per cycle.
///
/// There are no delete or modify operations.
#[derive(Debug, Default)]
pub struct DecisionLog {
    records: Vec<DecisionRecord>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that a decision for `cycle` may still be recorded.
    pub fn ensure_next(&self, cycle: u64) -> Result<(), LedgerError> {
        match self.records.last() {
            Some(last) if last.cycle == cycle => Err(LedgerError::DuplicateDecision(cycle)),
            Some(last) if last.cycle > cycle => Err(LedgerError::OutOfOrderDecision {
                last: last.cycle,
                requested: cycle,
            }),
            _ => Ok(()),
        }
    }

    pub fn append(&mut self, record: DecisionRecord) -> Result<(), LedgerError> {
        self.ensure_next(record.cycle)?;
        self.records.push(record);
        Ok(())
    }

    pub fn for_cycle(&self, cycle: u64) -> Option<&DecisionRecord> {
        self.records.iter().find(|r| r.cycle == cycle)
    }

    pub fn last(&self) -> Option<&DecisionRecord> {
        self.records.last()
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
