//! Shared response types

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    /// Service status
    #[cfg_attr(feature = "openapi", schema(example = "healthy"))]
    pub status: String,
    /// Current server time
    pub timestamp: DateTime<Utc>,
    /// Crate version
    #[cfg_attr(feature = "openapi", schema(example = "0.1.0"))]
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
