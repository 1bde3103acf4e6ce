use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use shelf_api::{
    create_api_router, ApiConfig, AppState, AuthConfig, BookStore, IdentityResolver,
    JwtIdentityResolver,
};
use shelf_core::BOOK_RESOURCE_KIND;
use shelf_storage::{BookRepository, CacheBackend, InMemoryCacheBackend, SearchCache, DEFAULT_SEARCH_TTL};
use shelf_test_utils::CountingRepository;
use tower::ServiceExt;

use super::auth::test_auth_config;

/// Response pieces the tests look at.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.body["is_success"].as_bool().unwrap_or(false)
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

/// Router over in-memory backends with handles kept for inspection.
pub struct TestApp {
    pub router: Router,
    pub repo: CountingRepository,
    pub cache: Arc<InMemoryCacheBackend>,
    pub store: BookStore,
}

impl TestApp {
    /// Counting in-memory repository, in-memory cache, real JWT resolver.
    pub fn new() -> Self {
        let cache = Arc::new(InMemoryCacheBackend::new());
        let repo = CountingRepository::in_memory();
        Self::build(repo, cache.clone(), cache, test_auth_config())
    }

    /// Same as [`TestApp::new`] but tokens are checked with `auth`.
    pub fn with_auth_config(auth: Arc<AuthConfig>) -> Self {
        let cache = Arc::new(InMemoryCacheBackend::new());
        Self::build(CountingRepository::in_memory(), cache.clone(), cache, auth)
    }

    /// Same as [`TestApp::new`] but the search cache uses `backend`.
    pub fn with_cache_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self::build(
            CountingRepository::in_memory(),
            Arc::new(InMemoryCacheBackend::new()),
            backend,
            test_auth_config(),
        )
    }

    /// Wrap an arbitrary repository (e.g. one that always fails).
    pub fn with_repository(inner: Arc<dyn BookRepository>) -> Self {
        let cache = Arc::new(InMemoryCacheBackend::new());
        Self::build(CountingRepository::new(inner), cache.clone(), cache, test_auth_config())
    }

    fn build(
        repo: CountingRepository,
        cache: Arc<InMemoryCacheBackend>,
        backend: Arc<dyn CacheBackend>,
        auth: Arc<AuthConfig>,
    ) -> Self {
        let search_cache = SearchCache::new(backend, BOOK_RESOURCE_KIND, DEFAULT_SEARCH_TTL);
        let store = BookStore::new(Arc::new(repo.clone()), search_cache);
        let resolver: Arc<dyn IdentityResolver> =
            Arc::new(JwtIdentityResolver::new(auth));
        let state = AppState::new(store.clone(), resolver, ApiConfig::default());
        let router = create_api_router(state).expect("router");
        Self {
            router,
            repo,
            cache,
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, None).await
    }

    /// Create a book as `authorization` and return its id.
    pub async fn create_book(&self, authorization: &str, body: Value) -> String {
        let response = self
            .send(Method::POST, "/api/v1/books", Some(authorization), Some(body))
            .await;
        assert_eq!(response.status, StatusCode::OK, "create failed: {:?}", response.body);
        response.data()["id"]
            .as_str()
            .expect("created book has an id")
            .to_string()
    }
}
