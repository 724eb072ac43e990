//! Result aggregation: one significance strategy across one primary KPI and
//! any number of secondary KPIs, merged with a single SRM check into one
//! report.
//!
//! The aggregator is stateless and synchronous: each call is a pure function
//! of (dataset, parameters). Group samples are recomputed per KPI and never
//! cached; nothing is retried and there is no fallback between strategies —
//! the caller picks exactly one strategy and it applies uniformly to the
//! primary and every secondary KPI.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONTROL_LABEL, DEFAULT_MC_DRAWS, DEFAULT_VARIANT_NAME, EXPECTED_SPLIT_RATIO, SRM_ALPHA,
};
use crate::dataset::Dataset;
use crate::errors::ExperimentError;
use crate::partition::{group_counts, partition};
use crate::significance::{SignificanceTest, Strategy, TestResult};
use crate::srm::detect_srm;

// =============================================================================
// REPORT TYPES
// =============================================================================

/// Dataset-level metadata attached to every report: group identities, sizes,
/// split percentages, and the SRM verdict (absent when the check is skipped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    pub control_name: String,
    pub variant_name: String,
    pub control_count: usize,
    pub variant_count: usize,
    /// Observed control share, in percent.
    pub actual_split: f64,
    /// Expected control share, in percent.
    pub expected_split: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srm_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srm_p_value: Option<f64>,
}

/// One full analysis: the primary KPI's result, one result per secondary KPI,
/// and dataset metadata. Produced fresh per call; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub strategy: Strategy,
    pub primary_kpi: TestResult,
    pub secondary_kpis: BTreeMap<String, TestResult>,
    pub analyzed_at: DateTime<Utc>,
}

/// Split a comma-separated KPI list into trimmed, non-empty names.
pub fn parse_kpi_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// ANALYZER
// =============================================================================

/// Configured entry point for one analysis run.
#[derive(Debug, Clone)]
pub struct Analyzer {
    strategy: Strategy,
    control_label: String,
    variant_label: Option<String>,
    expected_ratio: f64,
    srm_alpha: f64,
    check_srm: bool,
    draws: usize,
    seed: Option<u64>,
    test_id_column: Option<String>,
}

impl Analyzer {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            control_label: CONTROL_LABEL.to_string(),
            variant_label: None,
            expected_ratio: EXPECTED_SPLIT_RATIO,
            srm_alpha: SRM_ALPHA,
            check_srm: true,
            draws: DEFAULT_MC_DRAWS,
            seed: None,
            test_id_column: None,
        }
    }

    /// Restrict the variant sample to one explicit assignment label instead
    /// of pooling everything that is not control.
    pub fn with_variant(mut self, label: impl Into<String>) -> Self {
        self.variant_label = Some(label.into());
        self
    }

    /// Seed the Monte Carlo generator for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Override the Monte Carlo draw count (Bayesian strategy only).
    pub fn with_draws(mut self, draws: usize) -> Self {
        self.draws = draws;
        self
    }

    /// Read the report's test identifier from the first non-missing value of
    /// this column.
    pub fn with_test_id_column(mut self, column: impl Into<String>) -> Self {
        self.test_id_column = Some(column.into());
        self
    }

    /// Skip the SRM check; the report's meta then carries no SRM verdict.
    pub fn skip_srm(mut self) -> Self {
        self.check_srm = false;
        self
    }

    /// Analyze one dataset snapshot.
    ///
    /// Secondary KPI names are trimmed; empty entries, duplicates of the
    /// primary KPI, and repeated names are skipped. Any KPI failing its test
    /// propagates an error naming that KPI; no partial report is returned.
    pub fn analyze(
        &self,
        dataset: &Dataset,
        assignment_column: &str,
        primary_kpi: &str,
        secondary_kpis: &[String],
    ) -> Result<AnalysisReport, ExperimentError> {
        let engine = self.strategy.engine(self.draws);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let primary = self.run_kpi(
            dataset,
            assignment_column,
            primary_kpi,
            engine.as_ref(),
            &mut rng,
        )?;

        let mut secondary = BTreeMap::new();
        for raw in secondary_kpis {
            let kpi = raw.trim();
            if kpi.is_empty() || kpi == primary_kpi || secondary.contains_key(kpi) {
                continue;
            }
            let result =
                self.run_kpi(dataset, assignment_column, kpi, engine.as_ref(), &mut rng)?;
            secondary.insert(kpi.to_string(), result);
        }

        let meta = self.build_meta(dataset, assignment_column)?;

        Ok(AnalysisReport {
            meta,
            strategy: self.strategy,
            primary_kpi: primary,
            secondary_kpis: secondary,
            analyzed_at: Utc::now(),
        })
    }

    fn run_kpi(
        &self,
        dataset: &Dataset,
        assignment_column: &str,
        kpi: &str,
        engine: &dyn SignificanceTest,
        rng: &mut StdRng,
    ) -> Result<TestResult, ExperimentError> {
        let (control, variant) = partition(
            dataset,
            assignment_column,
            kpi,
            &self.control_label,
            self.variant_label.as_deref(),
            engine.missing_policy(),
        )?;

        engine
            .run(&control, &variant, rng)
            .map_err(|e| ExperimentError::for_kpi(kpi, e))
    }

    /// Group assignment is KPI-independent, so the SRM check and the split
    /// metadata are computed once per dataset, not per KPI.
    fn build_meta(
        &self,
        dataset: &Dataset,
        assignment_column: &str,
    ) -> Result<ReportMeta, ExperimentError> {
        let counts = group_counts(dataset, assignment_column)?;

        let test_name = match &self.test_id_column {
            Some(column) => {
                let col = dataset.require_column(column)?;
                (0..dataset.row_count()).find_map(|row| col.cell(row).map(|v| v.to_string()))
            }
            None => None,
        };

        let control_count = counts
            .iter()
            .find(|(label, _)| label == &self.control_label)
            .map(|&(_, n)| n)
            .unwrap_or(0);
        let (variant_name, variant_count) = counts
            .iter()
            .find(|(label, _)| label != &self.control_label)
            .map(|(label, n)| (label.clone(), *n))
            .unwrap_or_else(|| (DEFAULT_VARIANT_NAME.to_string(), 0));
        let total = control_count + variant_count;
        let actual_split = if total > 0 {
            control_count as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let (srm_detected, srm_p_value) = if self.check_srm {
            let srm = detect_srm(
                &counts,
                &self.control_label,
                self.expected_ratio,
                self.srm_alpha,
            )?;
            (Some(srm.srm_detected), Some(srm.p_value))
        } else {
            (None, None)
        };

        Ok(ReportMeta {
            test_name,
            control_name: self.control_label.clone(),
            variant_name,
            control_count,
            variant_count,
            actual_split,
            expected_split: self.expected_ratio * 100.0,
            srm_detected,
            srm_p_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let mut csv = String::from("Test ID,Variant,Revenue,Clicks\n");
        for i in 0..40 {
            csv.push_str(&format!("exp-42,Control,{},{}\n", 10 + i % 5, i % 3));
            csv.push_str(&format!("exp-42,Variant A,{},{}\n", 12 + i % 5, i % 4));
        }
        Dataset::from_csv_str(&csv).unwrap()
    }

    #[test]
    fn test_parse_kpi_list() {
        assert_eq!(
            parse_kpi_list(" Revenue , Clicks ,, Sessions"),
            vec!["Revenue", "Clicks", "Sessions"]
        );
        assert!(parse_kpi_list("").is_empty());
        assert!(parse_kpi_list(" , ,").is_empty());
    }

    #[test]
    fn test_primary_duplicate_skipped_in_secondaries() {
        let ds = dataset();
        let report = Analyzer::new(Strategy::RankSum)
            .analyze(
                &ds,
                "Variant",
                "Revenue",
                &["Revenue".to_string(), "Clicks".to_string(), "Clicks".to_string()],
            )
            .unwrap();

        assert!(!report.secondary_kpis.contains_key("Revenue"));
        assert_eq!(report.secondary_kpis.len(), 1);
        assert!(report.secondary_kpis.contains_key("Clicks"));
    }

    #[test]
    fn test_meta_fields() {
        let ds = dataset();
        let report = Analyzer::new(Strategy::RankSum)
            .with_test_id_column("Test ID")
            .analyze(&ds, "Variant", "Revenue", &[])
            .unwrap();

        assert_eq!(report.meta.test_name.as_deref(), Some("exp-42"));
        assert_eq!(report.meta.control_name, "Control");
        assert_eq!(report.meta.variant_name, "Variant A");
        assert_eq!(report.meta.control_count, 40);
        assert_eq!(report.meta.variant_count, 40);
        assert_eq!(report.meta.actual_split, 50.0);
        assert_eq!(report.meta.srm_detected, Some(false));
        assert!((report.meta.srm_p_value.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_skip_srm_leaves_verdict_empty() {
        let ds = dataset();
        let report = Analyzer::new(Strategy::RankSum)
            .skip_srm()
            .analyze(&ds, "Variant", "Revenue", &[])
            .unwrap();

        assert_eq!(report.meta.srm_detected, None);
        assert_eq!(report.meta.srm_p_value, None);
        // Group metadata survives the skip
        assert_eq!(report.meta.control_count, 40);
    }

    #[test]
    fn test_secondary_failure_names_the_kpi() {
        let ds = dataset();
        let err = Analyzer::new(Strategy::RankSum)
            .analyze(
                &ds,
                "Variant",
                "Revenue",
                &["Sessions".to_string()], // no such column
            )
            .unwrap_err();

        assert_eq!(err, ExperimentError::MissingColumn("Sessions".to_string()));
    }

    #[test]
    fn test_seeded_analysis_is_reproducible() {
        let ds = dataset();
        let analyzer = Analyzer::new(Strategy::Bayesian).with_seed(1234).with_draws(2000);

        let a = analyzer.analyze(&ds, "Variant", "Revenue", &[]).unwrap();
        let b = analyzer.analyze(&ds, "Variant", "Revenue", &[]).unwrap();

        assert_eq!(a.primary_kpi, b.primary_kpi);
    }

    #[test]
    fn test_explicit_variant_label() {
        let mut csv = String::from("Variant,Revenue\n");
        for i in 0..20 {
            csv.push_str(&format!("Control,{}\n", 10 + i % 3));
            csv.push_str(&format!("Variant A,{}\n", 11 + i % 3));
            csv.push_str(&format!("Variant B,{}\n", 50 + i % 3));
        }
        let ds = Dataset::from_csv_str(&csv).unwrap();

        let pooled = Analyzer::new(Strategy::RankSum)
            .analyze(&ds, "Variant", "Revenue", &[])
            .unwrap();
        let only_a = Analyzer::new(Strategy::RankSum)
            .with_variant("Variant A")
            .analyze(&ds, "Variant", "Revenue", &[])
            .unwrap();

        // Pooling Variant B's large values drags the variant mean far up.
        assert!(pooled.primary_kpi.variant_mean > only_a.primary_kpi.variant_mean);
    }
}
