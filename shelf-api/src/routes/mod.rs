//! REST API Routes Module
//!
//! Route handlers organized by resource, plus the router assembly:
//! - Book routes under /api/v1/books
//! - Liveness and readiness probes under /health
//! - OpenAPI document and Swagger UI
//! - Request ids, tracing spans, request timeout and CORS

pub mod book;
pub mod health;

use std::time::Duration;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::{header, request, HeaderValue, Method, Request},
    response::IntoResponse,
    routing::get,
    BoxError, Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::extractors::REQUEST_ID_HEADER;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub use book::create_router as book_router;
pub use health::create_router as health_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

/// Check if running in a production environment.
pub fn is_production_environment() -> bool {
    std::env::var("SHELF_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

/// Validate API configuration for production use.
fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set SHELF_CORS_ORIGINS.",
        ));
    }
    Ok(())
}

// ============================================================================
// TIMEOUT
// ============================================================================

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request timed out");
        ApiError::timeout()
    } else {
        ApiError::internal_error(format!("Unhandled middleware error: {}", err))
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins, including `*.domain`
/// wildcard entries.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let allowed = config.clone();
        let cors = cors
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &request::Parts| {
                    origin
                        .to_str()
                        .map(|o| allowed.is_origin_allowed(o))
                        .unwrap_or(false)
                },
            ))
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                REQUEST_ID_HEADER.clone(),
            ])
            .expose_headers([REQUEST_ID_HEADER.clone()]);

        if config.cors_allow_credentials {
            cors.allow_credentials(true)
        } else {
            cors
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// - Book routes under /api/v1/books
/// - Health checks at /health/*
/// - OpenAPI spec at /openapi.json
/// - Swagger UI at /swagger-ui, reading /api-docs/openapi.json (swagger-ui feature)
///
/// # Middleware Order (outer to inner)
/// 1. Request id - assigns `x-request-id` when the client sent none
/// 2. Trace - one span per request carrying the request id
/// 3. Propagate request id - copies it onto the response
/// 4. CORS
/// 5. Timeout - answers with a timeout envelope after `request_timeout`
pub fn create_api_router(state: AppState) -> ApiResult<Router> {
    let config = state.config.clone();
    config.validate()?;
    if is_production_environment() {
        validate_api_config_for_production(&config)?;
    }

    let api_routes = Router::new().nest("/books", book::create_router());

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router())
        .route("/openapi.json", get(openapi_json));

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
    }

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            REQUEST_ID_HEADER.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(&REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER.clone()))
        .layer(build_cors_layer(&config))
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .timeout(config.request_timeout);

    Ok(router.layer(middleware).with_state(state))
}
