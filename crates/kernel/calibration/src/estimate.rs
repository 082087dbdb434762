use serde::{Deserialize, Serialize};

use crate::quantile::chi_square_quantile;

/// Two-sided confidence level used for every sigma interval in the kernel.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Pooled sigma, `sqrt(SSE / df)`.
pub fn pooled_sigma(sse: f64, df: u64) -> Option<f64> {
    if df == 0 || !(sse > 0.0) || !sse.is_finite() {
        return None;
    }
    Some((sse / df as f64).sqrt())
}

/// Confidence interval for sigma.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigmaInterval {
    pub low: f64,
    pub high: f64,
}

impl SigmaInterval {
    /// Always non-negative, whichever way round the bounds came out.
    pub fn width(&self) -> f64 {
        (self.high - self.low).abs()
    }
}

/// Two-sided interval for sigma from pooled (SSE, df).
///
/// `sigma_low = sqrt(SSE / chi2(1 − α/2, df))`,
/// `sigma_high = sqrt(SSE / chi2(α/2, df))`. `None` when there is no estimate
/// or the lower quantile degenerates to zero (df too small for a finite
/// upper bound).
pub fn sigma_interval(sse: f64, df: u64, confidence: f64) -> Option<SigmaInterval> {
    pooled_sigma(sse, df)?;
    let alpha = 1.0 - confidence;
    let q_upper = chi_square_quantile(1.0 - alpha / 2.0, df as f64)?;
    let q_lower = chi_square_quantile(alpha / 2.0, df as f64)?;
    if !(q_lower > 0.0) {
        return None;
    }
    Some(SigmaInterval {
        low: (sse / q_upper).sqrt(),
        high: (sse / q_lower).sqrt(),
    })
}

/// Relative width `|high − low| / sigma`.
pub fn relative_width(interval: &SigmaInterval, sigma: f64) -> Option<f64> {
    if !(sigma > 0.0) {
        return None;
    }
    Some(interval.width() / sigma)
}

/// Full calibration picture for one pooled axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEstimate {
    pub sse: f64,
    pub df: u64,
    pub sigma: f64,
    pub interval: SigmaInterval,
    pub rel_width: f64,
}

impl CalibrationEstimate {
    /// Estimate at [`DEFAULT_CONFIDENCE`]; `None` when any piece is undefined.
    pub fn from_pooled(sse: f64, df: u64) -> Option<Self> {
        let sigma = pooled_sigma(sse, df)?;
        let interval = sigma_interval(sse, df, DEFAULT_CONFIDENCE)?;
        let rel_width = relative_width(&interval, sigma)?;
        Some(Self {
            sse,
            df,
            sigma,
            interval,
            rel_width,
        })
    }
}
