//! Sample-ratio-mismatch detection.
//!
//! Compares the observed control/variant counts against a fixed expected
//! allocation via a one-degree-of-freedom chi-squared goodness-of-fit test.
//! The detector works on exactly two groups: the control label and the first
//! non-control label encountered. Additional variant labels are NOT pooled —
//! an explicit, documented constraint of this check, inherited from the
//! system it replaces.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::constants::DEFAULT_VARIANT_NAME;
use crate::errors::ExperimentError;

/// Outcome of one SRM check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrmReport {
    pub control_label: String,
    pub variant_label: String,
    pub control_count: usize,
    pub variant_count: usize,
    /// Observed control share, in percent.
    pub actual_split: f64,
    /// Expected control share, in percent.
    pub expected_split: f64,
    pub chi_squared: f64,
    pub p_value: f64,
    pub srm_detected: bool,
}

/// Run the chi-squared goodness-of-fit test over observed group counts.
///
/// `observed` is ordered by first appearance in the dataset; the control
/// entry is matched by `control_label` and the first other entry is taken as
/// the variant (count 0 if there is none). A zero total is a precondition
/// violation, not a silent zero-ratio result.
pub fn detect_srm(
    observed: &[(String, usize)],
    control_label: &str,
    expected_ratio: f64,
    alpha: f64,
) -> Result<SrmReport, ExperimentError> {
    let control_count = observed
        .iter()
        .find(|(label, _)| label == control_label)
        .map(|&(_, n)| n)
        .unwrap_or(0);

    let (variant_label, variant_count) = observed
        .iter()
        .find(|(label, _)| label != control_label)
        .map(|(label, n)| (label.clone(), *n))
        .unwrap_or_else(|| (DEFAULT_VARIANT_NAME.to_string(), 0));

    let total = control_count + variant_count;
    if total == 0 {
        return Err(ExperimentError::ZeroTotalCount);
    }

    let total_f = total as f64;
    let observed_counts = [control_count as f64, variant_count as f64];
    let expected_counts = [total_f * expected_ratio, total_f * (1.0 - expected_ratio)];

    let mut chi_squared = 0.0;
    for (obs, exp) in observed_counts.iter().zip(expected_counts.iter()) {
        if *exp > 0.0 {
            chi_squared += (obs - exp).powi(2) / exp;
        }
    }

    let dist = ChiSquared::new(1.0).map_err(|e| ExperimentError::Numeric(e.to_string()))?;
    let p_value = 1.0 - dist.cdf(chi_squared);

    Ok(SrmReport {
        control_label: control_label.to_string(),
        variant_label,
        control_count,
        variant_count,
        actual_split: control_count as f64 / total_f * 100.0,
        expected_split: expected_ratio * 100.0,
        chi_squared,
        p_value,
        srm_detected: p_value < alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CONTROL_LABEL, EXPECTED_SPLIT_RATIO, SRM_ALPHA};

    fn counts(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
        pairs.iter().map(|&(l, n)| (l.to_string(), n)).collect()
    }

    #[test]
    fn test_perfect_split_yields_p_one() {
        let report = detect_srm(
            &counts(&[(CONTROL_LABEL, 500), ("Variant A", 500)]),
            CONTROL_LABEL,
            EXPECTED_SPLIT_RATIO,
            SRM_ALPHA,
        )
        .unwrap();

        assert_eq!(report.chi_squared, 0.0);
        assert!((report.p_value - 1.0).abs() < 1e-12);
        assert!(!report.srm_detected);
        assert_eq!(report.actual_split, 50.0);
    }

    #[test]
    fn test_skewed_split_is_detected() {
        // 400/600 over 1000: chi2 = 2 * 100^2 / 500 = 40, p ~ 2.5e-10.
        let report = detect_srm(
            &counts(&[(CONTROL_LABEL, 400), ("Variant A", 600)]),
            CONTROL_LABEL,
            EXPECTED_SPLIT_RATIO,
            SRM_ALPHA,
        )
        .unwrap();

        assert!((report.chi_squared - 40.0).abs() < 1e-9);
        assert!(report.p_value < 1e-6);
        assert!(report.srm_detected);
        assert_eq!(report.actual_split, 40.0);
    }

    #[test]
    fn test_small_imbalance_not_detected() {
        let report = detect_srm(
            &counts(&[(CONTROL_LABEL, 510), ("Variant A", 490)]),
            CONTROL_LABEL,
            EXPECTED_SPLIT_RATIO,
            SRM_ALPHA,
        )
        .unwrap();

        assert!(report.p_value > 0.05);
        assert!(!report.srm_detected);
    }

    #[test]
    fn test_only_first_variant_label_is_considered() {
        let report = detect_srm(
            &counts(&[(CONTROL_LABEL, 500), ("Variant A", 480), ("Variant B", 9999)]),
            CONTROL_LABEL,
            EXPECTED_SPLIT_RATIO,
            SRM_ALPHA,
        )
        .unwrap();

        assert_eq!(report.variant_label, "Variant A");
        assert_eq!(report.variant_count, 480);
        assert!(!report.srm_detected);
    }

    #[test]
    fn test_zero_total_is_an_error() {
        let err = detect_srm(&[], CONTROL_LABEL, EXPECTED_SPLIT_RATIO, SRM_ALPHA).unwrap_err();
        assert_eq!(err, ExperimentError::ZeroTotalCount);
    }

    #[test]
    fn test_missing_control_counts_as_zero() {
        let report = detect_srm(
            &counts(&[("Variant A", 100)]),
            CONTROL_LABEL,
            EXPECTED_SPLIT_RATIO,
            SRM_ALPHA,
        )
        .unwrap();

        assert_eq!(report.control_count, 0);
        assert!(report.srm_detected);
    }
}
