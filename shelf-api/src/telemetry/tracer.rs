//! Tracing Subscriber Initialization
//!
//! Installs an `EnvFilter` plus a JSON or human-readable fmt layer. Request
//! spans themselves come from tower-http's `TraceLayer` in the router.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "shelf_api=debug,shelf_storage=info,tower_http=debug,info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Log line format
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let environment =
            std::env::var("SHELF_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        // JSON unless explicitly asked for pretty output
        let format = match std::env::var("SHELF_LOG_FORMAT") {
            Ok(f) if f.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };
        Self {
            service_name: std::env::var("SHELF_SERVICE_NAME")
                .unwrap_or_else(|_| "shelf-api".to_string()),
            service_version: std::env::var("SHELF_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment,
            format,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup. A second call fails because a global subscriber
/// is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        environment = %config.environment,
        format = ?config.format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_default_and_format() {
        let _name = EnvVarGuard::set("SHELF_SERVICE_NAME", None);
        let format = EnvVarGuard::set("SHELF_LOG_FORMAT", None);
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "shelf-api");
        assert_eq!(config.format, LogFormat::Json);
        drop(format);

        let _format = EnvVarGuard::set("SHELF_LOG_FORMAT", Some("PRETTY"));
        assert_eq!(TelemetryConfig::default().format, LogFormat::Pretty);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
