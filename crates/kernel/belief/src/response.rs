//! Detection of dose-response curvature and time dependence in treated
//! conditions.

use std::collections::BTreeMap;

use crate::observation::ConditionSummary;

/// Interior residual, in standard errors, above which a dose series counts as
/// curved.
pub const CURVATURE_Z: f64 = 2.0;
/// Early-versus-late difference, in standard errors, above which a response
/// counts as time dependent.
pub const TIME_DEPENDENCE_Z: f64 = 2.0;

/// Summaries at one design point merged by well count.
#[derive(Clone, Debug, PartialEq)]
struct Pooled {
    n: f64,
    mean: f64,
    variance: f64,
    keys: Vec<String>,
}

fn pool<'a, I>(summaries: I) -> Option<Pooled>
where
    I: IntoIterator<Item = &'a ConditionSummary>,
{
    let mut n = 0.0;
    let mut sum = 0.0;
    let mut sse = 0.0;
    let mut df = 0.0;
    let mut keys = Vec::new();
    for s in summaries {
        let w = f64::from(s.n_wells);
        n += w;
        sum += w * s.mean;
        sse += s.replicate_sse();
        df += s.replicate_df() as f64;
        keys.push(s.key());
    }
    if n == 0.0 {
        return None;
    }
    Some(Pooled {
        n,
        mean: sum / n,
        variance: if df > 0.0 { sse / df } else { 0.0 },
        keys,
    })
}

/// A treated series that bends away from a straight line in log dose.
#[derive(Clone, Debug, PartialEq)]
pub struct CurvatureFinding {
    pub series: String,
    pub doses: usize,
    /// Largest interior residual in standard errors.
    pub z: f64,
    pub conditions: Vec<String>,
}

/// A treated condition whose response changes between its earliest and
/// latest timepoint.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeDependenceFinding {
    pub series: String,
    pub early_h: f64,
    pub late_h: f64,
    pub z: f64,
    pub conditions: Vec<String>,
}

/// Strongest curvature among treated dose series with at least three
/// positive doses.
///
/// Each series is compared with the straight line through its lowest and
/// highest dose in log space. `sigma` is the pooled noise estimate; series
/// fall back to their own replicate variance without one.
pub fn find_dose_curvature(
    conditions: &[ConditionSummary],
    sigma: Option<f64>,
) -> Option<CurvatureFinding> {
    let mut series: BTreeMap<String, BTreeMap<u64, Vec<&ConditionSummary>>> = BTreeMap::new();
    for c in conditions.iter().filter(|c| !c.is_vehicle() && c.dose_um > 0.0) {
        let key = format!("{}/{}/{}/{}", c.cell_line, c.compound, c.assay.name(), c.time_h);
        series
            .entry(key)
            .or_default()
            .entry(c.dose_um.to_bits())
            .or_default()
            .push(c);
    }

    let mut best: Option<CurvatureFinding> = None;
    for (key, by_dose) in series {
        if by_dose.len() < 3 {
            continue;
        }
        let mut points: Vec<(f64, Pooled)> = by_dose
            .into_iter()
            .filter_map(|(bits, group)| pool(group).map(|p| (f64::from_bits(bits).ln(), p)))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (Some((x0, first)), Some((x1, last))) = (points.first(), points.last()) else {
            continue;
        };
        let span = x1 - x0;
        if span <= 0.0 {
            continue;
        }
        let slope = (last.mean - first.mean) / span;

        let mut worst = 0.0_f64;
        for (x, p) in &points[1..points.len() - 1] {
            let s = sigma.unwrap_or_else(|| p.variance.sqrt());
            if !(s > 0.0) {
                continue;
            }
            let predicted = first.mean + slope * (x - x0);
            let z = (p.mean - predicted).abs() / (s / p.n.sqrt());
            worst = worst.max(z);
        }
        if worst > CURVATURE_Z && best.as_ref().map_or(true, |b| worst > b.z) {
            best = Some(CurvatureFinding {
                series: key,
                doses: points.len(),
                z: worst,
                conditions: points.iter().flat_map(|(_, p)| p.keys.clone()).collect(),
            });
        }
    }
    best
}

/// Strongest early-versus-late change among treated conditions observed at
/// two or more timepoints.
pub fn find_time_dependence(conditions: &[ConditionSummary]) -> Option<TimeDependenceFinding> {
    let mut series: BTreeMap<String, BTreeMap<u64, Vec<&ConditionSummary>>> = BTreeMap::new();
    for c in conditions.iter().filter(|c| !c.is_vehicle()) {
        let key = format!("{}/{}/{}/{}", c.cell_line, c.compound, c.assay.name(), c.dose_um);
        series
            .entry(key)
            .or_default()
            .entry(c.time_h.to_bits())
            .or_default()
            .push(c);
    }

    let mut best: Option<TimeDependenceFinding> = None;
    for (key, by_time) in series {
        if by_time.len() < 2 {
            continue;
        }
        let mut points: Vec<(f64, Pooled)> = by_time
            .into_iter()
            .filter_map(|(bits, group)| pool(group).map(|p| (f64::from_bits(bits), p)))
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (Some((early_h, early)), Some((late_h, late))) = (points.first(), points.last()) else {
            continue;
        };
        let se = (early.variance / early.n + late.variance / late.n).sqrt();
        if !(se > 0.0) {
            continue;
        }
        let z = (late.mean - early.mean).abs() / se;
        if z > TIME_DEPENDENCE_Z && best.as_ref().map_or(true, |b| z > b.z) {
            best = Some(TimeDependenceFinding {
                series: key,
                early_h: *early_h,
                late_h: *late_h,
                z,
                conditions: early.keys.iter().chain(late.keys.iter()).cloned().collect(),
            });
        }
    }
    best
}
