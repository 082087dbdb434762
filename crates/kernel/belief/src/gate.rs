use std::fmt;

use assaypilot_ledger::{breach, Covenant, CovenantViolation};
use serde::{Deserialize, Serialize};

use crate::observation::AssayKind;
use crate::policy::GatePolicy;

/// State of one calibration gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Undetermined,
    Earned,
    Revoked,
}

impl GateState {
    pub fn name(&self) -> &'static str {
        match self {
            GateState::Undetermined => "undetermined",
            GateState::Earned => "earned",
            GateState::Revoked => "revoked",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "undetermined" => Some(GateState::Undetermined),
            "earned" => Some(GateState::Earned),
            "revoked" => Some(GateState::Revoked),
            _ => None,
        }
    }

    pub fn is_earned(&self) -> bool {
        matches!(self, GateState::Earned)
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis a gate is kept on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAxis {
    Noise,
    Ldh,
    CellPaint,
    Scrna,
}

impl GateAxis {
    pub const ALL: [GateAxis; 4] = [
        GateAxis::Noise,
        GateAxis::Ldh,
        GateAxis::CellPaint,
        GateAxis::Scrna,
    ];

    /// Name used in gate markers and receipts.
    pub fn name(&self) -> &'static str {
        match self {
            GateAxis::Noise => "noise_sigma",
            GateAxis::Ldh => "ldh",
            GateAxis::CellPaint => "cell_paint",
            GateAxis::Scrna => "scrna",
        }
    }

    /// The gate that must be earned before this one may be.
    pub fn prerequisite(&self) -> Option<GateAxis> {
        match self {
            GateAxis::Noise => None,
            GateAxis::Ldh => Some(GateAxis::Noise),
            GateAxis::CellPaint => Some(GateAxis::Ldh),
            GateAxis::Scrna => Some(GateAxis::CellPaint),
        }
    }

    pub fn assay_axis(&self) -> Option<AssayAxis> {
        match self {
            GateAxis::Noise => None,
            GateAxis::Ldh => Some(AssayAxis::Ldh),
            GateAxis::CellPaint => Some(AssayAxis::CellPaint),
            GateAxis::Scrna => Some(AssayAxis::Scrna),
        }
    }
}

impl fmt::Display for GateAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-assay calibration axis, listed in ladder order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssayAxis {
    Ldh,
    CellPaint,
    Scrna,
}

impl AssayAxis {
    pub const LADDER: [AssayAxis; 3] = [AssayAxis::Ldh, AssayAxis::CellPaint, AssayAxis::Scrna];

    pub fn gate_axis(&self) -> GateAxis {
        match self {
            AssayAxis::Ldh => GateAxis::Ldh,
            AssayAxis::CellPaint => GateAxis::CellPaint,
            AssayAxis::Scrna => GateAxis::Scrna,
        }
    }

    pub fn assay_kind(&self) -> AssayKind {
        match self {
            AssayAxis::Ldh => AssayKind::Ldh,
            AssayAxis::CellPaint => AssayKind::CellPainting,
            AssayAxis::Scrna => AssayKind::Scrna,
        }
    }

    pub fn for_assay(kind: AssayKind) -> Option<Self> {
        match kind {
            AssayKind::Viability => None,
            AssayKind::Ldh => Some(AssayAxis::Ldh),
            AssayKind::CellPainting => Some(AssayAxis::CellPaint),
            AssayKind::Scrna => Some(AssayAxis::Scrna),
        }
    }

    /// Whether the gate may only be earned from directly measured evidence.
    pub fn rejects_proxy(&self) -> bool {
        matches!(self, AssayAxis::Scrna)
    }

    pub fn name(&self) -> &'static str {
        self.gate_axis().name()
    }
}

/// Gate state plus the current qualifying streak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub state: GateState,
    pub streak: u32,
}

/// What the estimator says about an axis this cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateReading {
    pub df: u64,
    pub rel_width: Option<f64>,
    /// Undefined drift does not block earning.
    pub drift: Option<f64>,
    pub prerequisite_earned: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationCause {
    WidthAtExit,
    DriftAtThreshold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetCause {
    BelowDfFloor,
    NoEstimate,
    WidthAboveEnter,
    DriftAtThreshold,
}

/// Outcome of one step of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateTransition {
    Earned,
    Revoked(RevocationCause),
    /// Earned and still inside the hysteresis band.
    Held,
    Advanced,
    Reset(ResetCause),
    /// Prerequisite gate not earned.
    Blocked,
}

impl GateTransition {
    pub fn label(&self) -> &'static str {
        match self {
            GateTransition::Earned => "earned",
            GateTransition::Revoked(RevocationCause::WidthAtExit) => "revoked_width",
            GateTransition::Revoked(RevocationCause::DriftAtThreshold) => "revoked_drift",
            GateTransition::Held => "held",
            GateTransition::Advanced => "advanced",
            GateTransition::Reset(ResetCause::BelowDfFloor) => "reset_df_floor",
            GateTransition::Reset(ResetCause::NoEstimate) => "reset_no_estimate",
            GateTransition::Reset(ResetCause::WidthAboveEnter) => "reset_width",
            GateTransition::Reset(ResetCause::DriftAtThreshold) => "reset_drift",
            GateTransition::Blocked => "blocked",
        }
    }
}

/// Advance a gate by one reading.
///
/// Pure. Entry needs `streak_required` consecutive qualifying readings; exit
/// is immediate. A width between enter and exit keeps an earned gate earned.
/// An earned gate without a width estimate is a covenant breach.
pub fn step(
    policy: &GatePolicy,
    status: GateStatus,
    reading: &GateReading,
    streak_required: u32,
) -> (GateStatus, GateTransition) {
    let drift_high = reading.drift.is_some_and(|d| d >= policy.drift_threshold);

    if status.state.is_earned() {
        let Some(rel_width) = reading.rel_width else {
            breach(CovenantViolation::new(
                Covenant::StableImpliesWidth,
                format!("earned gate at df={} has no relative width", reading.df),
            ));
        };
        if rel_width >= policy.exit_rel_width {
            return (
                GateStatus {
                    state: GateState::Revoked,
                    streak: 0,
                },
                GateTransition::Revoked(RevocationCause::WidthAtExit),
            );
        }
        if drift_high {
            return (
                GateStatus {
                    state: GateState::Revoked,
                    streak: 0,
                },
                GateTransition::Revoked(RevocationCause::DriftAtThreshold),
            );
        }
        return (status, GateTransition::Held);
    }

    let reset = |cause| {
        (
            GateStatus {
                state: status.state,
                streak: 0,
            },
            GateTransition::Reset(cause),
        )
    };

    if !reading.prerequisite_earned {
        return (
            GateStatus {
                state: status.state,
                streak: 0,
            },
            GateTransition::Blocked,
        );
    }
    if reading.df < policy.df_floor {
        return reset(ResetCause::BelowDfFloor);
    }
    let Some(rel_width) = reading.rel_width else {
        return reset(ResetCause::NoEstimate);
    };
    if rel_width > policy.enter_rel_width {
        return reset(ResetCause::WidthAboveEnter);
    }
    if drift_high {
        return reset(ResetCause::DriftAtThreshold);
    }

    let streak = status.streak.saturating_add(1);
    if streak >= streak_required {
        (
            GateStatus {
                state: GateState::Earned,
                streak,
            },
            GateTransition::Earned,
        )
    } else {
        (
            GateStatus {
                state: status.state,
                streak,
            },
            GateTransition::Advanced,
        )
    }
}
