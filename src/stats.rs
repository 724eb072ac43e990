//! Descriptive statistics over one numeric group sample.

use serde::{Deserialize, Serialize};

use crate::errors::ExperimentError;

/// Mean, median and population standard deviation of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Describe a non-empty numeric sample.
///
/// The standard deviation is the population form (divide by n, not n-1),
/// matching the normal fit of the Bayesian engine. A single-element sample
/// yields std 0 rather than failing.
pub fn describe(sample: &[f64]) -> Result<SampleSummary, ExperimentError> {
    if sample.is_empty() {
        return Err(ExperimentError::EmptySample);
    }

    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    Ok(SampleSummary {
        mean,
        median: median(sample),
        std_dev: variance.sqrt(),
    })
}

fn median(sample: &[f64]) -> f64 {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Percent change of the variant mean relative to the control mean.
///
/// A control mean of exactly 0 yields positive infinity by convention; the
/// caller formats it, it is never an error.
pub fn percent_lift(control_mean: f64, variant_mean: f64) -> f64 {
    if control_mean == 0.0 {
        f64::INFINITY
    } else {
        (variant_mean - control_mean) / control_mean * 100.0
    }
}

/// Render a lift value the way reports display it, e.g. `"12.34%"`.
pub fn format_lift(lift: f64) -> String {
    format!("{lift:.2}%")
}
