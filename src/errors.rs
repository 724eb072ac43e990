//! Structured error types for the analysis engine and the HTTP layer.
//!
//! `ExperimentError` is the engine's taxonomy: every input problem names the
//! column, KPI, or group that caused it, and propagates synchronously to the
//! caller. `AppError` wraps engine and transport failures into JSON responses
//! with machine-readable codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// ENGINE ERRORS
// =============================================================================

/// Input problems surfaced by the analysis engine. Never retried, never
/// silently swallowed; each message identifies the offending column or group.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExperimentError {
    #[error("Column not found: '{0}'")]
    MissingColumn(String),

    #[error("Group '{label}' has no rows for KPI '{kpi}'")]
    EmptyGroup { label: String, kpi: String },

    #[error("{group} group has {len} observation(s), need at least 2")]
    SampleTooSmall { group: &'static str, len: usize },

    #[error("Sample is empty")]
    EmptySample,

    #[error("Zero total count across control and variant")]
    ZeroTotalCount,

    #[error("Unknown strategy: '{0}' (expected 'bayesian' or 'rank_sum')")]
    UnknownStrategy(String),

    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("KPI '{kpi}': {source}")]
    Kpi {
        kpi: String,
        #[source]
        source: Box<ExperimentError>,
    },
}

impl ExperimentError {
    /// Attach the KPI being analyzed to an engine error, so callers always
    /// learn which KPI failed. Errors that already carry the KPI (partition
    /// errors) are left untouched.
    pub fn for_kpi(kpi: &str, err: ExperimentError) -> ExperimentError {
        match err {
            e @ (ExperimentError::EmptyGroup { .. } | ExperimentError::Kpi { .. }) => e,
            other => ExperimentError::Kpi {
                kpi: kpi.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::EmptyGroup { .. } => "EMPTY_GROUP",
            Self::SampleTooSmall { .. } => "SAMPLE_TOO_SMALL",
            Self::EmptySample => "EMPTY_SAMPLE",
            Self::ZeroTotalCount => "ZERO_TOTAL_COUNT",
            Self::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            Self::Numeric(_) => "NUMERIC_ERROR",
            Self::Kpi { source, .. } => source.code(),
        }
    }
}

// =============================================================================
// HTTP ERRORS
// =============================================================================

/// Structured error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization.
#[derive(Debug)]
pub enum AppError {
    // Validation errors (400)
    InvalidInput { field: String, reason: String },
    CsvParse(String),

    // Engine errors (400, except internal numeric failures)
    Experiment(ExperimentError),

    // Internal errors (500)
    Internal(anyhow::Error),
}

impl AppError {
    /// Get error code for client identification.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::CsvParse(_) => "CSV_PARSE_ERROR",
            Self::Experiment(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } | Self::CsvParse(_) => StatusCode::BAD_REQUEST,
            Self::Experiment(ExperimentError::Numeric(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Experiment(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get detailed error message.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { field, reason } => {
                format!("Invalid input for field '{field}': {reason}")
            }
            Self::CsvParse(msg) => format!("Failed to parse CSV: {msg}"),
            Self::Experiment(e) => e.to_string(),
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Convert to structured error response.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
            details: None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<ExperimentError> for AppError {
    fn from(err: ExperimentError) -> Self {
        Self::Experiment(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

/// Helper trait to convert validation errors.
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ExperimentError::MissingColumn("revenue".to_string()).code(),
            "MISSING_COLUMN"
        );
        assert_eq!(
            ExperimentError::UnknownStrategy("welch".to_string()).code(),
            "UNKNOWN_STRATEGY"
        );
    }

    #[test]
    fn test_kpi_wrapper_keeps_inner_code() {
        let err = ExperimentError::for_kpi(
            "revenue",
            ExperimentError::SampleTooSmall {
                group: "control",
                len: 1,
            },
        );
        assert_eq!(err.code(), "SAMPLE_TOO_SMALL");
        assert!(err.to_string().contains("revenue"));
    }

    #[test]
    fn test_kpi_wrapper_skips_errors_with_context() {
        // Partition errors already name the KPI; no double wrapping.
        let inner = ExperimentError::EmptyGroup {
            label: "Control".to_string(),
            kpi: "revenue".to_string(),
        };
        let err = ExperimentError::for_kpi("revenue", inner.clone());
        assert_eq!(err, inner);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::CsvParse("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Experiment(ExperimentError::ZeroTotalCount).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let err = AppError::Experiment(ExperimentError::MissingColumn("Clicks".to_string()));
        let response = err.to_response();

        assert_eq!(response.code, "MISSING_COLUMN");
        assert!(response.message.contains("Clicks"));
    }
}
