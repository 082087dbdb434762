//! Evidence Ledger: the audit leaf of the decision kernel.
//!
//! Every belief mutation, every per-cycle decision and every per-cycle noise
//! diagnostic ends up here as an immutable record. The ledger only constructs
//! and orders records; persisting them is the caller's business.
//!
//! ## Covenants
//!
//! - **Evidence per mutation**: a belief field never changes without an
//!   [`EvidenceEvent`] that declares it.
//! - **Gate markers**: gate-type fields additionally need a `gate_event:`,
//!   `gate_loss:` or `gate_shadow:` marker.
//! - **One decision per cycle**: the [`DecisionLog`] is append-only and totally
//!   ordered by cycle id.
//!
//! Covenant violations are not errors. They go through [`covenant::breach`],
//! which never returns.
//!
//! ## Record streams
//!
//! - [`EvidenceEvent`]: belief-change events
//! - [`DecisionRecord`]: per-cycle decision events
//! - [`NoiseDiagnostics`]: per-cycle noise diagnostics
//!
//! Each is serialized independently as one JSON object per line
//! ([`stream::encode_line`]).

pub mod covenant;
pub mod error;
pub mod event;
pub mod ledger;
pub mod records;
pub mod stream;

pub use covenant::{breach, Covenant, CovenantViolation};
pub use error::LedgerError;
pub use event::{EvidenceEvent, FieldValue, GateMarker};
pub use ledger::{DecisionLog, EvidenceLedger};
pub use records::{DecisionRecord, NoiseDiagnostics};
pub use stream::{encode_line, MemorySink, RecordSink, RecordStream};
