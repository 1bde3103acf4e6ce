//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::IdentityResolver;
use crate::config::ApiConfig;
use crate::store::BookStore;

/// Application-wide state shared across all routes.
///
/// Everything a handler touches is injected here by the caller of
/// [`crate::routes::create_api_router`]; there are no process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    /// Repository plus search cache.
    pub store: BookStore,
    /// Turns the `Authorization` header into an author identity.
    pub resolver: Arc<dyn IdentityResolver>,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: BookStore, resolver: Arc<dyn IdentityResolver>, config: ApiConfig) -> Self {
        Self {
            store,
            resolver,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(BookStore, store);
crate::impl_from_ref!(Arc<dyn IdentityResolver>, resolver);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Instant, start_time);
