use serde::Serialize;

use crate::error::LedgerError;
use crate::event::EvidenceEvent;
use crate::records::{DecisionRecord, NoiseDiagnostics};

/// The three append-only audit streams the kernel produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStream {
    BeliefChanges,
    Decisions,
    NoiseDiagnostics,
}

/// Encode one record as a single JSON line (no trailing newline).
pub fn encode_line<T: Serialize>(record: &T) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(record)?)
}

/// Destination for audit records. Persistence lives behind this trait.
pub trait RecordSink {
    fn belief_change(&mut self, event: &EvidenceEvent) -> Result<(), LedgerError>;
    fn decision(&mut self, record: &DecisionRecord) -> Result<(), LedgerError>;
    fn noise_diagnostics(&mut self, diagnostics: &NoiseDiagnostics) -> Result<(), LedgerError>;
}

/// In-memory sink holding each stream as JSON lines.
#[derive(Debug, Default)]
pub struct MemorySink {
    belief_changes: Vec<String>,
    decisions: Vec<String>,
    noise_diagnostics: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self, stream: RecordStream) -> &[String] {
        match stream {
            RecordStream::BeliefChanges => &self.belief_changes,
            RecordStream::Decisions => &self.decisions,
            RecordStream::NoiseDiagnostics => &self.noise_diagnostics,
        }
    }
}

impl RecordSink for MemorySink {
    fn belief_change(&mut self, event: &EvidenceEvent) -> Result<(), LedgerError> {
        self.belief_changes.push(encode_line(event)?);
        Ok(())
    }

    fn decision(&mut self, record: &DecisionRecord) -> Result<(), LedgerError> {
        self.decisions.push(encode_line(record)?);
        Ok(())
    }

    fn noise_diagnostics(&mut self, diagnostics: &NoiseDiagnostics) -> Result<(), LedgerError> {
        self.noise_diagnostics.push(encode_line(diagnostics)?);
        Ok(())
    }
}
