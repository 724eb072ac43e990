//! Variant partitioning: split dataset rows into two named numeric samples.
//!
//! The two significance engines disagree on missing KPI cells — the Bayesian
//! path drops the row, the rank-sum path zero-fills it. The divergence is
//! deliberate and preserved (unifying it would silently change numbers), so
//! the policy is an explicit parameter here rather than a hidden default.
//! Rows with a missing assignment cell are excluded under both policies, and
//! a present KPI cell that does not parse as a number coerces to 0 under both.

use crate::constants::DEFAULT_VARIANT_NAME;
use crate::dataset::{coerce_numeric, Dataset};
use crate::errors::ExperimentError;

/// What to do with a row whose KPI cell is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Drop the row entirely (Bayesian engine).
    DropRow,
    /// Keep the row with the KPI value zero-filled (rank-sum engine).
    ZeroFill,
}

/// Split one KPI column into (control, variant) samples.
///
/// With an explicit `variant_label`, only rows carrying exactly that label
/// form the variant sample. Without one, every row not labeled
/// `control_label` counts as variant, even if that pools several distinct
/// labels. Either sample coming out empty is an error, not a default.
pub fn partition(
    dataset: &Dataset,
    assignment_column: &str,
    kpi_column: &str,
    control_label: &str,
    variant_label: Option<&str>,
    policy: MissingPolicy,
) -> Result<(Vec<f64>, Vec<f64>), ExperimentError> {
    let assignment = dataset.require_column(assignment_column)?;
    let kpi = dataset.require_column(kpi_column)?;

    let mut control = Vec::new();
    let mut variant = Vec::new();

    for row in 0..dataset.row_count() {
        let Some(label) = assignment.cell(row) else {
            continue;
        };

        let bucket = if label == control_label {
            &mut control
        } else {
            match variant_label {
                Some(wanted) if label != wanted => continue,
                _ => &mut variant,
            }
        };

        match kpi.cell(row) {
            Some(cell) => bucket.push(coerce_numeric(cell)),
            None => match policy {
                MissingPolicy::DropRow => continue,
                MissingPolicy::ZeroFill => bucket.push(0.0),
            },
        }
    }

    if control.is_empty() {
        return Err(ExperimentError::EmptyGroup {
            label: control_label.to_string(),
            kpi: kpi_column.to_string(),
        });
    }
    if variant.is_empty() {
        return Err(ExperimentError::EmptyGroup {
            label: variant_label.unwrap_or(DEFAULT_VARIANT_NAME).to_string(),
            kpi: kpi_column.to_string(),
        });
    }

    Ok((control, variant))
}

/// Observed group sizes by assignment label, in order of first appearance.
/// Rows with a missing assignment cell are not counted.
pub fn group_counts(
    dataset: &Dataset,
    assignment_column: &str,
) -> Result<Vec<(String, usize)>, ExperimentError> {
    let assignment = dataset.require_column(assignment_column)?;

    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in 0..dataset.row_count() {
        let Some(label) = assignment.cell(row) else {
            continue;
        };
        match counts.iter_mut().find(|(name, _)| name == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }

    Ok(counts)
}
