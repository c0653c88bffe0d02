/// Health check endpoint
///
/// Verifies the server is running and probes database and cache
/// connectivity.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "cache": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Cache status
    pub cache: String,
}

/// Health check handler
///
/// The cache being down degrades the service but does not make it
/// unhealthy: reads fall through to the store and rate limiting fails
/// open.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_status = match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let cache_status = match state.cache.ping().await {
        Ok(true) => "connected",
        _ => "disconnected",
    };

    let status = if database_status == "connected" {
        if cache_status == "connected" {
            "healthy"
        } else {
            "degraded"
        }
    } else {
        "unhealthy"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_status.to_string(),
        cache: cache_status.to_string(),
    }))
}
