//! Analysis handlers: KPI discovery and the analysis run itself.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::router::AppState;
use crate::analysis::{parse_kpi_list, AnalysisReport, Analyzer};
use crate::dataset::Dataset;
use crate::errors::{AppError, ValidationErrorExt};
use crate::significance::Strategy;
use crate::validation;

fn default_strategy() -> String {
    "bayesian".to_string()
}

fn default_check_srm() -> bool {
    true
}

/// Request to list the KPI candidates (numeric columns) of a CSV snapshot.
#[derive(Debug, Deserialize)]
pub struct KpiColumnsRequest {
    pub csv: String,
}

#[derive(Debug, Serialize)]
pub struct KpiColumnsResponse {
    pub kpis: Vec<String>,
}

/// POST /api/kpis - parse a CSV snapshot and return its numeric columns.
pub async fn list_kpis(
    State(state): State<AppState>,
    Json(req): Json<KpiColumnsRequest>,
) -> Result<Json<KpiColumnsResponse>, AppError> {
    validation::validate_csv_payload(&req.csv, state.max_upload_bytes)
        .map_validation_err("csv")?;

    let dataset = Dataset::from_csv_str(&req.csv).map_err(|e| AppError::CsvParse(e.to_string()))?;

    Ok(Json(KpiColumnsResponse {
        kpis: dataset.numeric_columns(),
    }))
}

/// Request to analyze one CSV snapshot.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Raw CSV text, header row required.
    pub csv: String,
    /// Column whose string values label each row's group.
    pub assignment_column: String,
    /// The KPI the experiment is powered for.
    pub primary_kpi: String,
    /// Comma-separated secondary KPI names (optional).
    #[serde(default)]
    pub secondary_kpis: String,
    /// `"bayesian"` (default) or `"rank_sum"`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Explicit variant label; absent means all non-control rows.
    #[serde(default)]
    pub variant: Option<String>,
    /// Seed for the Monte Carlo generator (reproducible runs).
    #[serde(default)]
    pub seed: Option<u64>,
    /// Per-request Monte Carlo draw count override.
    #[serde(default)]
    pub draws: Option<usize>,
    /// Column holding the experiment identifier for the report meta.
    #[serde(default)]
    pub test_id_column: Option<String>,
    /// Run the sample-ratio-mismatch check (default: true).
    #[serde(default = "default_check_srm")]
    pub check_srm: bool,
}

/// POST /api/analyze - run one full analysis over an uploaded CSV snapshot.
pub async fn analyze_csv(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    validation::validate_csv_payload(&req.csv, state.max_upload_bytes)
        .map_validation_err("csv")?;
    validation::validate_column_name(&req.assignment_column)
        .map_validation_err("assignment_column")?;
    validation::validate_column_name(&req.primary_kpi).map_validation_err("primary_kpi")?;
    if let Some(column) = &req.test_id_column {
        validation::validate_column_name(column).map_validation_err("test_id_column")?;
    }

    let draws = req.draws.unwrap_or(state.draws);
    validation::validate_draws(draws).map_validation_err("draws")?;

    let strategy: Strategy = req.strategy.parse()?;

    let dataset = Dataset::from_csv_str(&req.csv).map_err(|e| AppError::CsvParse(e.to_string()))?;
    let secondary = parse_kpi_list(&req.secondary_kpis);

    let mut analyzer = Analyzer::new(strategy).with_draws(draws);
    if let Some(label) = req.variant {
        analyzer = analyzer.with_variant(label);
    }
    if let Some(seed) = req.seed {
        analyzer = analyzer.with_seed(seed);
    }
    if let Some(column) = req.test_id_column {
        analyzer = analyzer.with_test_id_column(column);
    }
    if !req.check_srm {
        analyzer = analyzer.skip_srm();
    }

    // The Monte Carlo simulation is CPU-bound; keep it off the async workers.
    let assignment_column = req.assignment_column;
    let primary_kpi = req.primary_kpi;
    let rows = dataset.row_count();
    let report = tokio::task::spawn_blocking(move || {
        analyzer.analyze(&dataset, &assignment_column, &primary_kpi, &secondary)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("analysis task panicked: {e}")))??;

    info!(
        strategy = ?report.strategy,
        rows,
        primary = %report.primary_kpi.percent_lift,
        secondaries = report.secondary_kpis.len(),
        "analysis complete"
    );

    Ok(Json(report))
}
