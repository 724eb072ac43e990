//! HTTP API handlers.
//!
//! Thin transport around the analysis engine: decode the request, hand the
//! parsed dataset and parameters to the core, serialize the report.

pub mod analyze;
pub mod health;
pub mod router;

pub use router::{build_api_routes, build_public_routes, build_router, AppState};
