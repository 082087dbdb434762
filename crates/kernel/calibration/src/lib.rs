//! Calibration Estimator: pure statistics over pooled replicate variance.
//!
//! Every function takes (sum of squared errors, degrees of freedom) or a
//! history of per-cycle sigma estimates and returns a number or `None`.
//! Nothing here holds state, logs, or fails: zero df or a non-positive SSE
//! simply means "no estimate".
//!
//! - [`pooled_sigma`]: `sqrt(SSE / df)`
//! - [`sigma_interval`]: two-sided CI for sigma via the Wilson–Hilferty
//!   chi-square approximation
//! - [`relative_width`]: `|high − low| / sigma`
//! - [`drift_metric`]: shift between the last two windows of per-cycle sigma
//! - [`df_for_relative_width`]: df needed before a target width is reachable

pub mod drift;
pub mod estimate;
pub mod planning;
pub mod quantile;

pub use drift::drift_metric;
pub use estimate::{
    pooled_sigma, relative_width, sigma_interval, CalibrationEstimate, SigmaInterval,
    DEFAULT_CONFIDENCE,
};
pub use planning::{df_for_relative_width, relative_width_for_df};
pub use quantile::{chi_square_quantile, normal_quantile};
