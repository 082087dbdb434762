//! Belief State: the single mutable aggregate of the decision loop.
//!
//! Turns per-cycle condition summaries into calibration estimates and gates,
//! and makes every change accountable.
//!
//! ## Invariants
//!
//! - **Single accountable setter**: every field change goes through
//!   [`BeliefState::set`], which emits an evidence event for it.
//! - **Gate markers**: gate-type fields (stable flags, gate states, edge
//!   confidence) only change with a `gate_event:` / `gate_loss:` marker.
//! - **Temporal causality**: a belief about timepoint `t_claim` may only use
//!   evidence taken at `t_evidence >= t_claim`.
//! - **Monotonic df**: pooled degrees of freedom never decrease.
//!
//! ## Gate state machine
//!
//! Per axis: `Undetermined → Earned` after `K` consecutive qualifying readings
//! (df floor, relative width ≤ enter threshold, drift below threshold);
//! `Earned → Revoked` immediately when the width reaches the exit threshold or
//! drift reaches its threshold. Assay axes form a ladder
//! (noise → LDH → Cell Painting → scRNA) and scRNA cannot be earned from proxy
//! evidence.

pub mod axes;
pub mod debt;
pub mod error;
pub mod field;
pub mod gate;
pub mod observation;
pub mod policy;
pub mod response;
pub mod state;
pub mod update;

pub use axes::{AssayAxisState, EdgeEffectAxis, ExplorationLog, InsolvencyAxis, NoiseAxis, ResponseAxes};
pub use error::BeliefError;
pub use field::{AssayField, BeliefField};
pub use gate::{
    step, AssayAxis, GateAxis, GateReading, GateState, GateStatus, GateTransition,
    ResetCause, RevocationCause,
};
pub use observation::{AssayKind, ConditionSummary, Observation, Position, VEHICLE};
pub use policy::{DebtPolicy, GatePolicy};
pub use state::{BeliefState, EvidenceTimes, Support};
