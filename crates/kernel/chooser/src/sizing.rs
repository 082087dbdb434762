use assaypilot_belief::{AssayAxis, BeliefState, GateAxis, Position};
use assaypilot_calibration::{df_for_relative_width, DEFAULT_CONFIDENCE};

use crate::config::ChooserConfig;
use crate::template::Template;
use crate::traits::BatchSizingPolicy;

const MAX_PLANNED_DF: u64 = 100_000;

/// Default sizing: amortize the per-cycle cost before the noise gate, save
/// wells after it.
#[derive(Clone, Copy, Debug, Default)]
pub struct AmortizedBatchSizing;

impl AmortizedBatchSizing {
    /// Degrees of freedom at which the gate's width threshold becomes
    /// reachable, never below the df floor.
    fn target_df(beliefs: &BeliefState) -> u64 {
        let policy = beliefs.policy();
        df_for_relative_width(policy.enter_rel_width, DEFAULT_CONFIDENCE, MAX_PLANNED_DF)
            .unwrap_or(policy.df_floor)
            .max(policy.df_floor)
    }
}

fn to_wells(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl BatchSizingPolicy for AmortizedBatchSizing {
    fn baseline_wells(&self, beliefs: &BeliefState, config: &ChooserConfig, budget: u32) -> u32 {
        let floor = config.min_batch_wells;
        if beliefs.is_earned(GateAxis::Noise) {
            return floor;
        }
        // One condition per batch costs one df.
        let needed = Self::target_df(beliefs).saturating_sub(beliefs.noise().df) + 1;
        let cap = floor.max(budget / 4);
        to_wells(needed).clamp(floor, cap)
    }

    fn assay_wells(&self, axis: AssayAxis, beliefs: &BeliefState, config: &ChooserConfig) -> u32 {
        let state = beliefs.assay(axis);
        let have = if axis.rejects_proxy() {
            state.measured_df
        } else {
            state.df
        };
        // Center and edge conditions each cost one df.
        let needed = Self::target_df(beliefs).saturating_sub(have) + 2;
        to_wells(needed).max(config.min_batch_wells)
    }

    /// A baseline batch splits evenly over its positions, so a position with
    /// `a` of `t` calibration wells reaches fraction `f` after `w` more wells
    /// once `a + w/k >= f * (t + w)`.
    fn coverage_wells(
        &self,
        position: Position,
        beliefs: &BeliefState,
        config: &ChooserConfig,
        budget: u32,
    ) -> u32 {
        let exploration = beliefs.exploration();
        let have = exploration.calibration_wells_at(position.name()) as f64;
        let total = exploration.calibration_wells_total() as f64;
        let positions = Template::BaselineReplicates.positions().len().max(1) as f64;
        let share = 1.0 / positions;
        let fraction = config.coverage_min_fraction;

        let for_count = (config.coverage_min_wells as f64 - have).max(0.0) / share;
        let for_fraction = if fraction < share {
            (fraction * total - have).max(0.0) / (share - fraction)
        } else {
            f64::from(budget)
        };
        // Round up to whole wells per position, plus one per position for
        // the fraction boundary.
        let per_position = (for_count.max(for_fraction) / positions).ceil() + 1.0;
        let needed = (per_position * positions).min(f64::from(u32::MAX)) as u32;

        let floor = config.min_batch_wells;
        needed.max(floor).min(budget.max(floor))
    }
}
