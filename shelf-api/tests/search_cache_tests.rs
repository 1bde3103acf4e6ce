//! Search endpoint and its lookaside cache, driven through the router.

mod support;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use shelf_core::{AuthorId, EntityIdType, PageRequest, BOOK_RESOURCE_KIND};
use shelf_storage::{search_key, CacheBackend, DEFAULT_SEARCH_TTL};
use shelf_test_utils::FailingCacheBackend;
use support::*;

const SEARCH_URI: &str = "/api/v1/books/search?q=rust&page=1&limit=10";

async fn seed(app: &TestApp, bearer: &str) -> String {
    app.create_book(
        bearer,
        json!({"title": "Rust in Action", "description": "Systems", "price": 30}),
    )
    .await;
    app.create_book(
        bearer,
        json!({"title": "Go Basics", "description": "Not about rust at all", "price": 20}),
    )
    .await
}

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    seed(&app, &bearer).await;

    let first = app.get(SEARCH_URI).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.code(), "s-book-001");
    assert_eq!(first.data().as_array().map(Vec::len), Some(2));
    assert_eq!(app.repo.search_calls(), 1);

    let second = app.get(SEARCH_URI).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.data(), first.data());
    assert_eq!(app.repo.search_calls(), 1);

    let stats = app.store.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.stores, 1);
}

#[tokio::test]
async fn different_pages_are_cached_separately() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    seed(&app, &bearer).await;

    let page_one = app.get("/api/v1/books/search?q=rust&page=1&limit=1").await;
    let page_two = app.get("/api/v1/books/search?q=rust&page=2&limit=1").await;

    assert_eq!(page_one.data().as_array().map(Vec::len), Some(1));
    assert_eq!(page_two.data().as_array().map(Vec::len), Some(1));
    assert_ne!(page_one.data()[0]["id"], page_two.data()[0]["id"]);
    assert_eq!(app.repo.search_calls(), 2);
    assert_eq!(app.cache.len().await, 2);
}

#[tokio::test]
async fn create_invalidates_cached_results() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    seed(&app, &bearer).await;

    app.get(SEARCH_URI).await;
    assert_eq!(app.repo.search_calls(), 1);

    app.create_book(
        &bearer,
        json!({"title": "Rust Atomics", "description": "Locks", "price": 40}),
    )
    .await;
    assert!(app.cache.is_empty().await);

    let after = app.get(SEARCH_URI).await;
    assert_eq!(app.repo.search_calls(), 2);
    assert_eq!(after.data().as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn update_invalidates_cached_results() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    let id = seed(&app, &bearer).await;

    app.get(SEARCH_URI).await;

    let response = app
        .send(
            Method::PATCH,
            &format!("/api/v1/books/{id}"),
            Some(&bearer),
            Some(json!({"description": "Only Go here"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let after = app.get(SEARCH_URI).await;
    assert_eq!(app.repo.search_calls(), 2);
    assert_eq!(after.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn delete_invalidates_cached_results() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    let id = seed(&app, &bearer).await;

    app.get(SEARCH_URI).await;

    let response = app
        .send(Method::DELETE, &format!("/api/v1/books/{id}"), Some(&bearer), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let after = app.get(SEARCH_URI).await;
    assert_eq!(app.repo.search_calls(), 2);
    assert_eq!(after.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn refused_write_keeps_cache_intact() {
    let app = TestApp::new();
    let owner = bearer_for(&test_auth_config(), AuthorId::now_v7());
    let stranger = bearer_for(&test_auth_config(), AuthorId::now_v7());
    let id = seed(&app, &owner).await;

    app.get(SEARCH_URI).await;

    let response = app
        .send(Method::DELETE, &format!("/api/v1/books/{id}"), Some(&stranger), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    app.get(SEARCH_URI).await;
    assert_eq!(app.repo.search_calls(), 1);
}

#[tokio::test]
async fn unavailable_cache_falls_back_to_repository() {
    let backend = Arc::new(FailingCacheBackend::new());
    let app = TestApp::with_cache_backend(backend.clone());
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    seed(&app, &bearer).await;

    for _ in 0..2 {
        let response = app.get(SEARCH_URI).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.data().as_array().map(Vec::len), Some(2));
    }

    assert_eq!(app.repo.search_calls(), 2);
    assert!(backend.calls() > 0);
    assert!(app.store.cache_stats().errors > 0);
}

#[tokio::test]
async fn undecodable_cache_entry_is_ignored() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    seed(&app, &bearer).await;

    let page = PageRequest::new(1, 10).expect("valid page");
    let key = search_key(BOOK_RESOURCE_KIND, "rust", page);
    app.cache
        .set(&key, b"not json".to_vec(), DEFAULT_SEARCH_TTL)
        .await
        .expect("memory cache accepts writes");

    let response = app.get(SEARCH_URI).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data().as_array().map(Vec::len), Some(2));
    assert_eq!(app.repo.search_calls(), 1);

    // The fresh result replaced the bad entry.
    app.get(SEARCH_URI).await;
    assert_eq!(app.repo.search_calls(), 1);
}

#[tokio::test]
async fn search_requires_page_and_limit() {
    let app = TestApp::new();

    for uri in [
        "/api/v1/books/search?q=rust",
        "/api/v1/books/search?q=rust&page=1",
        "/api/v1/books/search?q=rust&limit=10",
        "/api/v1/books/search?q=rust&page=0&limit=10",
        "/api/v1/books/search?q=rust&page=one&limit=10",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "uri {uri}");
        assert_eq!(response.code(), "e-request-001", "uri {uri}");
    }
    assert_eq!(app.repo.search_calls(), 0);
}

#[tokio::test]
async fn empty_query_matches_everything() {
    let app = TestApp::new();
    let bearer = bearer_for(&test_auth_config(), AuthorId::now_v7());
    seed(&app, &bearer).await;

    let response = app.get("/api/v1/books/search?page=1&limit=10").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data().as_array().map(Vec::len), Some(2));
}
