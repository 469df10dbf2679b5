//! Descriptive statistics over sample sets.

use serde::Serialize;

/// Percentiles reported in every distribution band.
pub const PERCENTILES: [f64; 6] = [1.0, 25.0, 50.0, 75.0, 95.0, 99.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub p1: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Band {
    fn from_sorted(sorted: &[f64]) -> Option<Self> {
        if sorted.is_empty() {
            return None;
        }
        let [p1, p25, p50, p75, p95, p99] = PERCENTILES.map(|p| percentile(sorted, p));
        Some(Band {
            p1,
            p25,
            p50,
            p75,
            p95,
            p99,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; undefined below two samples.
    pub stdev: Option<f64>,
    pub band: Option<Band>,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Summary {
            count: values.len(),
            mean: mean(values),
            stdev: sample_stdev(values),
            band: Band::from_sorted(&sorted),
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Percentile `p` (0..=100) of ascending `sorted`, interpolating linearly
/// between the two closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
