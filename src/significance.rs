//! Two-sample significance testing, polymorphic over two strategies.
//!
//! Both engines consume a (control, variant) pair of numeric samples and
//! produce one `TestResult`; the aggregator stays strategy-agnostic behind
//! the `SignificanceTest` trait.
//!
//! - `BayesianSimulation` fits each group to a normal distribution by its
//!   empirical mean and population std (method of moments, no goodness-of-fit
//!   check on the normality assumption — a known limitation), draws 10,000
//!   simulated observations per group, and reports the fraction of positions
//!   where the variant draw exceeds the control draw. Draws are independent
//!   and compared positionally, not as a paired difference distribution.
//! - `RankSum` is the two-sided Mann-Whitney U test with the asymptotic
//!   normal approximation (average ranks on ties, no tie correction in the
//!   variance). It additionally reports `variant_better` as a plain median
//!   comparison — an independent signal, not implied by the p-value.
//!
//! Randomness is never global: the Monte Carlo engine draws from an
//! explicitly passed, seedable generator scoped to one analysis call.

use std::str::FromStr;

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::constants::{BAYESIAN_THRESHOLD, DEFAULT_MC_DRAWS, MIN_GROUP_SIZE, RANK_SUM_ALPHA};
use crate::errors::ExperimentError;
use crate::partition::MissingPolicy;
use crate::stats::{describe, format_lift, percent_lift};

// =============================================================================
// STRATEGY SELECTION
// =============================================================================

/// The two interchangeable inference strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Bayesian,
    RankSum,
}

impl Strategy {
    /// Build the engine for this strategy. `draws` only affects the Bayesian
    /// simulation.
    pub fn engine(self, draws: usize) -> Box<dyn SignificanceTest> {
        match self {
            Strategy::Bayesian => Box::new(BayesianSimulation {
                threshold: BAYESIAN_THRESHOLD,
                draws,
            }),
            Strategy::RankSum => Box::new(RankSum {
                alpha: RANK_SUM_ALPHA,
            }),
        }
    }
}

impl FromStr for Strategy {
    type Err = ExperimentError;

    /// An unrecognized name fails fast; there is no default fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bayesian" => Ok(Strategy::Bayesian),
            "rank_sum" => Ok(Strategy::RankSum),
            other => Err(ExperimentError::UnknownStrategy(other.to_string())),
        }
    }
}

// =============================================================================
// TEST RESULT
// =============================================================================

/// Outcome of one two-sample test. Medians and `variant_better` are only
/// reported by the rank-sum engine; `evidence` is the posterior probability
/// for the Bayesian engine and the p-value for rank-sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub control_mean: f64,
    pub variant_mean: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_median: Option<f64>,
    /// Formatted percent lift of the variant mean over the control mean,
    /// e.g. `"12.34%"`. A zero control mean renders as `"inf%"`.
    pub percent_lift: String,
    /// Engine-specific evidence value.
    pub evidence: f64,
    pub significant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_better: Option<bool>,
}

// =============================================================================
// ENGINE TRAIT
// =============================================================================

/// A two-sample significance test.
pub trait SignificanceTest: Send + Sync {
    fn name(&self) -> &'static str;

    /// How this engine wants missing KPI cells handled during partitioning.
    fn missing_policy(&self) -> MissingPolicy;

    /// Run the test. Both samples must carry at least two observations;
    /// degenerate input is an error, never a NaN result.
    fn run(
        &self,
        control: &[f64],
        variant: &[f64],
        rng: &mut StdRng,
    ) -> Result<TestResult, ExperimentError>;
}

fn check_sample_sizes(control: &[f64], variant: &[f64]) -> Result<(), ExperimentError> {
    if control.len() < MIN_GROUP_SIZE {
        return Err(ExperimentError::SampleTooSmall {
            group: "control",
            len: control.len(),
        });
    }
    if variant.len() < MIN_GROUP_SIZE {
        return Err(ExperimentError::SampleTooSmall {
            group: "variant",
            len: variant.len(),
        });
    }
    Ok(())
}

fn std_normal() -> Result<Normal, ExperimentError> {
    Normal::new(0.0, 1.0).map_err(|e| ExperimentError::Numeric(e.to_string()))
}

// =============================================================================
// BAYESIAN SIMULATION
// =============================================================================

/// Monte Carlo comparison of two fitted normal distributions.
#[derive(Debug, Clone, Copy)]
pub struct BayesianSimulation {
    /// Posterior probability above which the verdict is "significant".
    pub threshold: f64,
    /// Simulated observations per group.
    pub draws: usize,
}

impl Default for BayesianSimulation {
    fn default() -> Self {
        Self {
            threshold: BAYESIAN_THRESHOLD,
            draws: DEFAULT_MC_DRAWS,
        }
    }
}

impl SignificanceTest for BayesianSimulation {
    fn name(&self) -> &'static str {
        "bayesian"
    }

    fn missing_policy(&self) -> MissingPolicy {
        MissingPolicy::DropRow
    }

    fn run(
        &self,
        control: &[f64],
        variant: &[f64],
        rng: &mut StdRng,
    ) -> Result<TestResult, ExperimentError> {
        check_sample_sizes(control, variant)?;

        let c = describe(control)?;
        let v = describe(variant)?;

        // Draw from N(mean, std) by scaling standard-normal draws; a
        // zero-variance group degenerates to its mean, matching the
        // method-of-moments fit.
        let unit = std_normal()?;
        let mut exceed = 0usize;
        for _ in 0..self.draws {
            let control_draw = c.mean + c.std_dev * unit.sample(rng);
            let variant_draw = v.mean + v.std_dev * unit.sample(rng);
            if variant_draw > control_draw {
                exceed += 1;
            }
        }

        let posterior = exceed as f64 / self.draws as f64;

        Ok(TestResult {
            control_mean: c.mean,
            variant_mean: v.mean,
            control_median: None,
            variant_median: None,
            percent_lift: format_lift(percent_lift(c.mean, v.mean)),
            evidence: posterior,
            significant: posterior > self.threshold,
            variant_better: None,
        })
    }
}

// =============================================================================
// RANK-SUM (MANN-WHITNEY U)
// =============================================================================

/// Two-sided Mann-Whitney U test with the large-sample normal approximation.
#[derive(Debug, Clone, Copy)]
pub struct RankSum {
    /// Two-sided significance level.
    pub alpha: f64,
}

impl Default for RankSum {
    fn default() -> Self {
        Self {
            alpha: RANK_SUM_ALPHA,
        }
    }
}

impl SignificanceTest for RankSum {
    fn name(&self) -> &'static str {
        "rank_sum"
    }

    fn missing_policy(&self) -> MissingPolicy {
        MissingPolicy::ZeroFill
    }

    fn run(
        &self,
        control: &[f64],
        variant: &[f64],
        _rng: &mut StdRng,
    ) -> Result<TestResult, ExperimentError> {
        check_sample_sizes(control, variant)?;

        let c = describe(control)?;
        let v = describe(variant)?;

        let (u, n1, n2) = u_statistic(control, variant);

        // Normal approximation for the two-sided p-value. A vanishing sigma
        // falls back to z = 0 (p = 1).
        let mu = (n1 * n2) / 2.0;
        let sigma = (n1 * n2 * (n1 + n2 + 1.0) / 12.0).sqrt();
        let z = if sigma != 0.0 { (u - mu) / sigma } else { 0.0 };

        let unit = std_normal()?;
        let p_value = (2.0 * (1.0 - unit.cdf(z.abs()))).min(1.0);

        Ok(TestResult {
            control_mean: c.mean,
            variant_mean: v.mean,
            control_median: Some(c.median),
            variant_median: Some(v.median),
            percent_lift: format_lift(percent_lift(c.mean, v.mean)),
            evidence: p_value,
            significant: p_value < self.alpha,
            variant_better: Some(v.median > c.median),
        })
    }
}

/// The smaller of the two U statistics, with average ranks on ties.
fn u_statistic(control: &[f64], variant: &[f64]) -> (f64, f64, f64) {
    let n1 = control.len();
    let n2 = variant.len();

    let mut combined: Vec<(f64, bool)> = Vec::with_capacity(n1 + n2);
    combined.extend(control.iter().map(|&x| (x, false)));
    combined.extend(variant.iter().map(|&x| (x, true)));
    combined.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    // Assign ranks, averaging runs of tied values.
    let mut rank_sum_control = 0.0;
    let mut i = 0;
    while i < combined.len() {
        let mut j = i;
        while j < combined.len() && combined[j].0 == combined[i].0 {
            j += 1;
        }
        let avg_rank = ((i + 1) + j) as f64 / 2.0;
        for entry in &combined[i..j] {
            if !entry.1 {
                rank_sum_control += avg_rank;
            }
        }
        i = j;
    }

    let n1 = n1 as f64;
    let n2 = n2 as f64;
    let u1 = rank_sum_control - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;

    (u1.min(u2), n1, n2)
}
