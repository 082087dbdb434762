use crate::estimate::{relative_width, sigma_interval};

/// Relative width of the sigma interval after `df` degrees of freedom.
///
/// The relative width does not depend on the scale of the data, so a unit
/// SSE per df stands in for any pooled estimate.
pub fn relative_width_for_df(df: u64, confidence: f64) -> Option<f64> {
    let sse = df as f64;
    let interval = sigma_interval(sse, df, confidence)?;
    relative_width(&interval, 1.0)
}

/// Smallest df (up to `max_df`) whose relative width is at or below `target`.
pub fn df_for_relative_width(target: f64, confidence: f64, max_df: u64) -> Option<u64> {
    let reaches = |df: u64| relative_width_for_df(df, confidence).is_some_and(|w| w <= target);
    if max_df == 0 || !reaches(max_df) {
        return None;
    }
    // Relative width decreases monotonically in df.
    let (mut lo, mut hi) = (1u64, max_df);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if reaches(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Some(lo)
}
