//! Shelf API - REST API Layer
//!
//! JSON REST surface for the Shelf book catalogue. Handlers validate the
//! request, resolve the caller from a bearer token, call the [`BookStore`]
//! (repository plus search cache) and answer with a uniform [`Envelope`].
//!
//! Every dependency is injected through [`AppState`], so the same router
//! runs against PostgreSQL and Redis in production and against in-memory
//! backends in tests.

mod macros;

pub mod auth;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, Claims,
    IdentityResolver, JwtIdentityResolver,
};
pub use config::{ApiConfig, CacheConfig, StorageBackend};
pub use db::{DbConfig, PostgresBookRepository};
pub use envelope::{Envelope, SUCCESS_CODE};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use store::BookStore;
pub use types::*;
