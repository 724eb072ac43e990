//! Configuration management for the analysis server.
//!
//! All configurable parameters in one place with environment variable
//! overrides. Sensible defaults, configurable in production.

use std::env;

use tracing::info;

use crate::constants::{
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_UPLOAD_MB, DEFAULT_MC_DRAWS, DEFAULT_PORT,
};

/// CORS configuration.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = allow all)
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // The original deployment served a local frontend.
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl CorsConfig {
    /// Load from `PRAYOG_CORS_ORIGINS` (comma-separated; `*` or empty means
    /// allow all origins).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(origins) = env::var("PRAYOG_CORS_ORIGINS") {
            if origins.trim() == "*" {
                config.allowed_origins = Vec::new();
            } else {
                config.allowed_origins = origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        config
    }

    /// Build the tower-http CORS layer from this configuration.
    pub fn to_layer(&self) -> tower_http::cors::CorsLayer {
        use axum::http::Method;
        use tower_http::cors::{AllowOrigin, Any, CorsLayer};

        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);

        if self.allowed_origins.is_empty() {
            return layer.allow_origin(Any);
        }

        let mut valid_origins = Vec::new();
        for origin_str in &self.allowed_origins {
            match origin_str.parse::<axum::http::HeaderValue>() {
                Ok(origin) => valid_origins.push(origin),
                Err(_) => tracing::warn!("CORS: Invalid origin '{}' - skipping", origin_str),
            }
        }

        if valid_origins.is_empty() {
            // All configured origins failed to parse - reject cross-origin
            // requests rather than falling back to permissive.
            tracing::error!(
                "CORS: All {} configured origin(s) failed to parse. \
                 Rejecting all cross-origin requests. Fix PRAYOG_CORS_ORIGINS.",
                self.allowed_origins.len()
            );
        }

        layer.allow_origin(AllowOrigin::list(valid_origins))
    }
}

/// Server configuration with environment overrides.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server port (default: 3030)
    pub port: u16,
    /// CORS settings
    pub cors: CorsConfig,
    /// Maximum accepted request body size, in bytes
    pub max_upload_bytes: usize,
    /// Maximum concurrently processed requests
    pub max_concurrent_requests: usize,
    /// Default Monte Carlo draw count for the Bayesian engine
    pub draws: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors: CorsConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            draws: DEFAULT_MC_DRAWS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables:
    ///
    /// - `PRAYOG_PORT`             - server port (default: 3030)
    /// - `PRAYOG_CORS_ORIGINS`     - comma-separated allowed origins
    /// - `PRAYOG_MAX_UPLOAD_MB`    - CSV payload cap in megabytes
    /// - `PRAYOG_MAX_CONCURRENT`   - concurrent request cap
    /// - `PRAYOG_MC_DRAWS`         - default Monte Carlo draws
    pub fn from_env() -> Self {
        let mut config = Self {
            cors: CorsConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = env::var("PRAYOG_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        if let Ok(val) = env::var("PRAYOG_MAX_UPLOAD_MB") {
            if let Ok(mb) = val.parse::<usize>() {
                config.max_upload_bytes = mb * 1024 * 1024;
            }
        }

        if let Ok(val) = env::var("PRAYOG_MAX_CONCURRENT") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_requests = n;
            }
        }

        if let Ok(val) = env::var("PRAYOG_MC_DRAWS") {
            if let Ok(n) = val.parse() {
                config.draws = n;
            }
        }

        config
    }

    /// Log the effective configuration at startup.
    pub fn log(&self) {
        info!("Configuration:");
        info!("   Port: {}", self.port);
        info!(
            "   CORS origins: {}",
            if self.cors.allowed_origins.is_empty() {
                "any".to_string()
            } else {
                self.cors.allowed_origins.join(", ")
            }
        );
        info!("   Max upload: {} bytes", self.max_upload_bytes);
        info!("   Max concurrent requests: {}", self.max_concurrent_requests);
        info!("   Monte Carlo draws: {}", self.draws);
    }
}
