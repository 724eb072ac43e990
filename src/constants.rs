//! Central constants for the experiment analysis engine and server.
//!
//! All tunables in one place. Request parameters and environment variables
//! may override the server-level values; the statistical defaults are the
//! documented contract of the engine.

// =============================================================================
// GROUP LABELS
// =============================================================================

/// The one assignment-column value recognized as the control group.
pub const CONTROL_LABEL: &str = "Control";

/// Display name for the variant group when no explicit variant label exists
/// (all non-control rows pooled together).
pub const DEFAULT_VARIANT_NAME: &str = "Variant";

// =============================================================================
// SIGNIFICANCE TESTING
// =============================================================================

/// Number of Monte Carlo draws per group for the Bayesian simulation.
pub const DEFAULT_MC_DRAWS: usize = 10_000;

/// Upper bound on per-request Monte Carlo draws.
pub const MAX_MC_DRAWS: usize = 1_000_000;

/// Posterior probability above which the Bayesian engine reports significance.
pub const BAYESIAN_THRESHOLD: f64 = 0.95;

/// Two-sided alpha for the rank-sum (Mann-Whitney) engine. Deliberately
/// permissive relative to the customary 0.05.
pub const RANK_SUM_ALPHA: f64 = 0.10;

/// Minimum observations per group for either significance engine.
pub const MIN_GROUP_SIZE: usize = 2;

// =============================================================================
// SAMPLE RATIO MISMATCH
// =============================================================================

/// Expected share of traffic in the control group.
pub const EXPECTED_SPLIT_RATIO: f64 = 0.5;

/// Chi-squared p-value below which an SRM is flagged.
pub const SRM_ALPHA: f64 = 0.05;

// =============================================================================
// SERVER LIMITS
// =============================================================================

/// Default server port.
pub const DEFAULT_PORT: u16 = 3030;

/// Default cap on uploaded CSV payloads, in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 16;

/// Default cap on concurrently processed requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Maximum length of a column name in a request.
pub const MAX_COLUMN_NAME_LENGTH: usize = 256;
