//! Shelf API Server Entry Point
//!
//! Bootstraps configuration, builds the repository and search cache
//! backends, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use shelf_api::{
    create_api_router, ApiConfig, ApiError, ApiResult,
    AppState, AuthConfig, BookStore, CacheConfig, DbConfig, JwtIdentityResolver,
    PostgresBookRepository, StorageBackend,
};
use shelf_api::telemetry::{init_tracing, TelemetryConfig};
use shelf_core::BOOK_RESOURCE_KIND;
use shelf_storage::{
    BookRepository, CacheBackend, InMemoryBookRepository, InMemoryCacheBackend,
    RedisCacheBackend, SearchCache,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    let repo = build_repository().await?;
    let search_cache = build_search_cache().await;
    let store = BookStore::new(repo, search_cache);

    let resolver = Arc::new(JwtIdentityResolver::new(Arc::new(auth_config)));
    let state = AppState::new(store, resolver, api_config);
    let app = create_api_router(state)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Shelf API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn build_repository() -> ApiResult<Arc<dyn BookRepository>> {
    match StorageBackend::from_env()? {
        StorageBackend::Postgres => {
            let db_config = DbConfig::from_env();
            tracing::info!(host = %db_config.host, port = db_config.port, dbname = %db_config.dbname, "Using PostgreSQL repository");
            let repo = PostgresBookRepository::from_config(&db_config)?;
            repo.ensure_schema().await.map_err(|e| {
                ApiError::service_unavailable(format!("Failed to prepare database schema: {}", e))
            })?;
            Ok(Arc::new(repo))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory repository; data is lost on restart");
            Ok(Arc::new(InMemoryBookRepository::new()))
        }
    }
}

/// Redis when configured and reachable, otherwise the in-memory backend.
async fn build_search_cache() -> SearchCache {
    let cache_config = CacheConfig::from_env();

    let backend: Arc<dyn CacheBackend> = match cache_config.redis_url.as_deref() {
        Some(url) => match RedisCacheBackend::connect(url).await {
            Ok(redis) => {
                tracing::info!("Using Redis search cache");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory search cache");
                Arc::new(InMemoryCacheBackend::new())
            }
        },
        None => {
            tracing::info!("SHELF_REDIS_URL not set, using in-memory search cache");
            Arc::new(InMemoryCacheBackend::new())
        }
    };

    SearchCache::new(backend, BOOK_RESOURCE_KIND, cache_config.search_ttl)
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("SHELF_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("SHELF_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
