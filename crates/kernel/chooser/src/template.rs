use std::fmt;

use assaypilot_belief::{AssayAxis, Position};
use serde::{Deserialize, Serialize};

/// What executing a template does to the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// Spends wells on vehicle controls; always allowed past the debt block.
    Calibration,
    Biology,
    Proposal,
    Terminal,
}

/// Action template catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    BaselineReplicates,
    Cycle0FullPlate,
    EdgeCenterTest,
    CalibrateLdhBaseline,
    CalibrateCellPaintBaseline,
    CalibrateScrnaBaseline,
    DoseLadderCoarse,
    TimeCourse,
    ProposeLibraryExpansion,
    Abort,
}

const BOTH: &[Position] = &[Position::Center, Position::Edge];

impl Template {
    pub const ALL: [Template; 10] = [
        Template::BaselineReplicates,
        Template::Cycle0FullPlate,
        Template::EdgeCenterTest,
        Template::CalibrateLdhBaseline,
        Template::CalibrateCellPaintBaseline,
        Template::CalibrateScrnaBaseline,
        Template::DoseLadderCoarse,
        Template::TimeCourse,
        Template::ProposeLibraryExpansion,
        Template::Abort,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Template::BaselineReplicates => "baseline_replicates",
            Template::Cycle0FullPlate => "cycle0_full_plate",
            Template::EdgeCenterTest => "edge_center_test",
            Template::CalibrateLdhBaseline => "calibrate_ldh_baseline",
            Template::CalibrateCellPaintBaseline => "calibrate_cell_paint_baseline",
            Template::CalibrateScrnaBaseline => "calibrate_scrna_baseline",
            Template::DoseLadderCoarse => "dose_ladder_coarse",
            Template::TimeCourse => "time_course",
            Template::ProposeLibraryExpansion => "propose_library_expansion",
            Template::Abort => "abort",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn class(&self) -> ActionClass {
        match self {
            Template::BaselineReplicates
            | Template::Cycle0FullPlate
            | Template::EdgeCenterTest
            | Template::CalibrateLdhBaseline
            | Template::CalibrateCellPaintBaseline
            | Template::CalibrateScrnaBaseline => ActionClass::Calibration,
            Template::DoseLadderCoarse | Template::TimeCourse => ActionClass::Biology,
            Template::ProposeLibraryExpansion => ActionClass::Proposal,
            Template::Abort => ActionClass::Terminal,
        }
    }

    /// Whether the agent may only pick this template with explicit
    /// authorization.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Template::CalibrateScrnaBaseline)
    }

    /// Plate positions the template places wells on.
    pub fn positions(&self) -> &'static [Position] {
        match self {
            Template::ProposeLibraryExpansion | Template::Abort => &[],
            _ => BOTH,
        }
    }

    /// Calibration template that earns an assay gate.
    pub fn for_assay(axis: AssayAxis) -> Self {
        match axis {
            AssayAxis::Ldh => Template::CalibrateLdhBaseline,
            AssayAxis::CellPaint => Template::CalibrateCellPaintBaseline,
            AssayAxis::Scrna => Template::CalibrateScrnaBaseline,
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
