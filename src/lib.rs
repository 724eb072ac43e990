//! Prayog - A/B experiment analysis service.
//!
//! Analyzes one tabular dataset snapshot per call: partitions rows into
//! control and variant groups, computes descriptive statistics per KPI,
//! judges significance with one of two interchangeable engines (Bayesian
//! Monte Carlo simulation or Mann-Whitney rank-sum), and checks the observed
//! traffic split for sample-ratio mismatch.
//!
//! # Key properties
//! - Stateless: every analysis is a pure function of (dataset, parameters)
//! - Deterministic when seeded: the Monte Carlo generator is passed
//!   explicitly, never process-global
//! - Input errors always name the offending column, KPI, or group

pub mod analysis;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod errors;
pub mod handlers;
pub mod partition;
pub mod significance;
pub mod srm;
pub mod stats;
pub mod validation;

pub use analysis::{AnalysisReport, Analyzer, ReportMeta};
pub use dataset::Dataset;
pub use errors::ExperimentError;
pub use significance::{Strategy, TestResult};
pub use srm::SrmReport;
