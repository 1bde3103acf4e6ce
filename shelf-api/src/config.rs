//! API Configuration Module
//!
//! CORS, request limits, pagination defaults and backend selection, loaded
//! from `SHELF_*` environment variables with development defaults.

use shelf_core::{ConfigError, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use shelf_storage::DEFAULT_SEARCH_TTL;
use std::time::Duration;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP-facing configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Request Handling
    // ========================================================================
    /// Page size used by `GET /books` when no parameters are given.
    pub default_page_limit: u32,

    /// Upper bound on handler time before a timeout envelope is returned.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `SHELF_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `SHELF_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `SHELF_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `SHELF_DEFAULT_PAGE_LIMIT`: Default page size (default: 20, capped at 100)
    /// - `SHELF_REQUEST_TIMEOUT_SECS`: Request timeout (default: 30)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("SHELF_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("SHELF_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let default_page_limit = env_parse::<u32>("SHELF_DEFAULT_PAGE_LIMIT")
            .filter(|limit| (1..=MAX_PAGE_LIMIT).contains(limit))
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: env_parse("SHELF_CORS_MAX_AGE_SECS").unwrap_or(86400),
            default_page_limit,
            request_timeout: Duration::from_secs(
                env_parse("SHELF_REQUEST_TIMEOUT_SECS").unwrap_or(30),
            ),
        }
    }

    /// Strict CORS is on when an explicit origin list is configured.
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.shelf.run
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }

    /// Credentials with a wildcard origin are rejected by browsers; refuse
    /// that combination up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cors_allow_credentials && self.cors_origins.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "SHELF_CORS_ALLOW_CREDENTIALS".to_string(),
                value: "true".to_string(),
                reason: "requires SHELF_CORS_ORIGINS to list explicit origins".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// STORAGE AND CACHE SELECTION
// ============================================================================

/// Which repository implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// PostgreSQL via the connection pool
    #[default]
    Postgres,
    /// Process-local map, for development and tests
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::InvalidValue {
                field: "SHELF_STORAGE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected 'postgres' or 'memory'".to_string(),
            }),
        }
    }
}

impl StorageBackend {
    /// Read `SHELF_STORAGE_BACKEND` (default: postgres).
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("SHELF_STORAGE_BACKEND") {
            Ok(value) => value.parse(),
            Err(_) => Ok(StorageBackend::default()),
        }
    }
}

/// Search cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Redis URL. `None` selects the in-memory backend.
    pub redis_url: Option<String>,

    /// Lifetime of a cached search page.
    pub search_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            search_ttl: DEFAULT_SEARCH_TTL,
        }
    }
}

impl CacheConfig {
    /// - `SHELF_REDIS_URL`: Redis connection URL (unset = in-memory cache)
    /// - `SHELF_SEARCH_CACHE_TTL_SECS`: Search cache TTL (default: 300)
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("SHELF_REDIS_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            search_ttl: env_parse("SHELF_SEARCH_CACHE_TTL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SEARCH_TTL),
        }
    }
}
