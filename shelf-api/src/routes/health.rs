//! Probes under `/health`, open to anonymous callers.
//!
//! `ready` answers 503 only when the book repository cannot be reached.
//! The search cache is reported for visibility but a cache outage leaves the
//! service ready, since searches then fall back to the repository.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::state::AppState;
use crate::store::BookStore;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub repository: RepositoryHealth,
    pub search_cache: SearchCacheHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Outcome of probing the book repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RepositoryHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Books currently stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Search cache counters since startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchCacheHealth {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Process answers HTTP", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
)]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("shelf is running".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

async fn probe_repository(store: &BookStore) -> RepositoryHealth {
    let started = Instant::now();
    let probed = match store.health_check().await {
        Ok(()) => store.count().await,
        Err(e) => Err(e),
    };

    match probed {
        Ok(book_count) => RepositoryHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)),
            book_count: Some(book_count),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Book repository failed readiness probe");
            RepositoryHealth {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                book_count: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Book repository reachable", body = HealthResponse),
        (status = 503, description = "Book repository unreachable", body = HealthResponse),
    ),
)]
pub async fn readiness(
    State(store): State<BookStore>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let repository = probe_repository(&store).await;
    let stats = store.cache_stats();
    let status = repository.status;

    let response = HealthResponse {
        status,
        message: None,
        details: Some(HealthDetails {
            repository,
            search_cache: SearchCacheHealth {
                hits: stats.hits,
                misses: stats.misses,
                errors: stats.errors,
                hit_rate: stats.hit_rate(),
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
