/// Drift of the per-cycle sigma series.
///
/// Takes the most recent `2 * window` entries of `history` (oldest first),
/// splits them into a prior and a recent window of `window` each, and returns
/// `|mean(recent) − mean(prior)| / pooled_sigma`. Undefined until the history
/// holds `2 * window` entries.
pub fn drift_metric(history: &[f64], window: usize, pooled_sigma: f64) -> Option<f64> {
    if window == 0 || history.len() < 2 * window || !(pooled_sigma > 0.0) {
        return None;
    }
    let tail = &history[history.len() - 2 * window..];
    let (prior, recent) = tail.split_at(window);
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    Some((mean(recent) - mean(prior)).abs() / pooled_sigma)
}
