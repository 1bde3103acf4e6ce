//! Book REST API Routes
//!
//! Every handler is a fixed pipeline: validate the request, resolve the
//! caller (writes only), touch the store, respond with an [`Envelope`].
//! Writes invalidate cached searches inside [`BookStore`].

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Router,
};
use chrono::Utc;
use shelf_core::{Book, BookId};
use std::sync::Arc;

use crate::{
    auth::{AuthContext, IdentityResolver},
    config::ApiConfig,
    envelope::Envelope,
    error::{ApiError, ApiResult},
    extractors::{Credentials, PathId, RequestId, ValidatedJson},
    state::AppState,
    store::BookStore,
    types::{CreateBookRequest, PageQuery, SearchQuery, UpdateBookRequest},
    validation::HasUpdates,
};

/// Message returned when a caller mutates a book they do not own.
pub const NOT_OWNER_MESSAGE: &str = "user is not owner of this book";

// ============================================================================
// HELPERS
// ============================================================================

fn ensure_owner(book: &Book, auth: &AuthContext, request_id: &RequestId) -> ApiResult<()> {
    if book.is_owned_by(auth.author_id) {
        return Ok(());
    }
    tracing::warn!(
        request_id = %request_id,
        book_id = %book.id,
        caller = %auth.author_id,
        owner = %book.author_id,
        "Ownership check denied"
    );
    Err(ApiError::forbidden(NOT_OWNER_MESSAGE))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::invalid_argument("query", rejection.body_text()))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/books - Create a book owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/books",
    tag = "Books",
    request_body = CreateBookRequest,
    responses(
        (status = 200, description = "Book created", body = Envelope<Book>),
        (status = 400, description = "Invalid request or persistence failure", body = Envelope<String>),
        (status = 401, description = "Unauthenticated", body = Envelope<String>),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_book(
    State(store): State<BookStore>,
    State(resolver): State<Arc<dyn IdentityResolver>>,
    request_id: RequestId,
    credentials: Credentials,
    ValidatedJson(req): ValidatedJson<CreateBookRequest>,
) -> ApiResult<Envelope<Book>> {
    let auth = resolver.resolve(credentials.as_deref())?;

    let book = req.into_book(auth.author_id, Utc::now());
    let created = store
        .create(&book)
        .await
        .map_err(|e| request_id.storage_error(e))?;

    tracing::info!(
        request_id = %request_id,
        book_id = %created.id,
        author_id = %created.author_id,
        "Book created"
    );
    Ok(Envelope::success(created))
}

/// GET /api/v1/books - First page of all books
#[utoipa::path(
    get,
    path = "/api/v1/books",
    tag = "Books",
    params(
        ("page" = Option<u32>, Query, description = "Page number, starting at 1 (default 1)"),
        ("limit" = Option<u32>, Query, description = "Page size, 1 to 100 (default configured)"),
    ),
    responses(
        (status = 200, description = "Books in creation order", body = Envelope<Vec<Book>>),
        (status = 400, description = "Invalid pagination parameters", body = Envelope<String>),
    )
)]
pub async fn list_books(
    State(store): State<BookStore>,
    State(config): State<Arc<ApiConfig>>,
    request_id: RequestId,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<Book>>> {
    let page = query_params(query)?
        .page_request_or_default(config.default_page_limit)
        .map_err(|e| request_id.storage_error(e))?;

    let books = store
        .list(page)
        .await
        .map_err(|e| request_id.storage_error(e))?;
    Ok(Envelope::success(books))
}

/// GET /api/v1/books/page - One page of books
#[utoipa::path(
    get,
    path = "/api/v1/books/page",
    tag = "Books",
    params(
        ("page" = u32, Query, description = "Page number, starting at 1"),
        ("limit" = u32, Query, description = "Page size, 1 to 100"),
    ),
    responses(
        (status = 200, description = "Books in creation order", body = Envelope<Vec<Book>>),
        (status = 400, description = "Invalid pagination parameters", body = Envelope<String>),
    )
)]
pub async fn list_books_page(
    State(store): State<BookStore>,
    request_id: RequestId,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<Book>>> {
    let page = query_params(query)?
        .page_request()
        .map_err(|e| request_id.storage_error(e))?;

    let books = store
        .list(page)
        .await
        .map_err(|e| request_id.storage_error(e))?;
    Ok(Envelope::success(books))
}

/// GET /api/v1/books/search - Cached text search
#[utoipa::path(
    get,
    path = "/api/v1/books/search",
    tag = "Books",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive text matched against title or description"),
        ("page" = u32, Query, description = "Page number, starting at 1"),
        ("limit" = u32, Query, description = "Page size, 1 to 100"),
    ),
    responses(
        (status = 200, description = "Matching books", body = Envelope<Vec<Book>>),
        (status = 400, description = "Invalid pagination parameters", body = Envelope<String>),
    )
)]
pub async fn search_books(
    State(store): State<BookStore>,
    request_id: RequestId,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<Book>>> {
    let params = query_params(query)?;
    let page = params
        .page_request()
        .map_err(|e| request_id.storage_error(e))?;

    let books = store
        .search(&params.q, page)
        .await
        .map_err(|e| request_id.storage_error(e))?;
    Ok(Envelope::success(books))
}

/// GET /api/v1/books/{id} - Fetch one book
#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    tag = "Books",
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    responses(
        (status = 200, description = "Book details", body = Envelope<Book>),
        (status = 400, description = "Malformed id", body = Envelope<String>),
        (status = 404, description = "Book not found", body = Envelope<String>),
    )
)]
pub async fn get_book(
    State(store): State<BookStore>,
    request_id: RequestId,
    PathId(id): PathId<BookId>,
) -> ApiResult<Envelope<Book>> {
    let book = store
        .get(id)
        .await
        .map_err(|e| request_id.storage_error(e))?;
    Ok(Envelope::success(book))
}

/// PUT|PATCH /api/v1/books/{id} - Sparse update by the owner
#[utoipa::path(
    patch,
    path = "/api/v1/books/{id}",
    tag = "Books",
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = Envelope<String>),
        (status = 400, description = "Invalid request", body = Envelope<String>),
        (status = 401, description = "Unauthenticated", body = Envelope<String>),
        (status = 403, description = "Caller does not own the book", body = Envelope<String>),
        (status = 404, description = "Book not found", body = Envelope<String>),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_book(
    State(store): State<BookStore>,
    State(resolver): State<Arc<dyn IdentityResolver>>,
    request_id: RequestId,
    credentials: Credentials,
    PathId(id): PathId<BookId>,
    ValidatedJson(req): ValidatedJson<UpdateBookRequest>,
) -> ApiResult<Envelope<String>> {
    let auth = resolver.resolve(credentials.as_deref())?;

    let book = store
        .get(id)
        .await
        .map_err(|e| request_id.storage_error(e))?;
    ensure_owner(&book, &auth, &request_id)?;

    if !req.has_any_updates() {
        tracing::debug!(request_id = %request_id, book_id = %id, "Empty update, nothing to persist");
        return Ok(Envelope::message("update book successfully"));
    }

    store
        .update(&book, &req.into_patch())
        .await
        .map_err(|e| request_id.storage_error(e))?;

    tracing::info!(request_id = %request_id, book_id = %id, "Book updated");
    Ok(Envelope::message("update book successfully"))
}

/// DELETE /api/v1/books/{id} - Delete by the owner
#[utoipa::path(
    delete,
    path = "/api/v1/books/{id}",
    tag = "Books",
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    responses(
        (status = 200, description = "Book deleted", body = Envelope<String>),
        (status = 401, description = "Unauthenticated", body = Envelope<String>),
        (status = 403, description = "Caller does not own the book", body = Envelope<String>),
        (status = 404, description = "Book not found", body = Envelope<String>),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_book(
    State(store): State<BookStore>,
    State(resolver): State<Arc<dyn IdentityResolver>>,
    request_id: RequestId,
    credentials: Credentials,
    PathId(id): PathId<BookId>,
) -> ApiResult<Envelope<String>> {
    let auth = resolver.resolve(credentials.as_deref())?;

    let book = store
        .get(id)
        .await
        .map_err(|e| request_id.storage_error(e))?;
    ensure_owner(&book, &auth, &request_id)?;

    store
        .delete(id)
        .await
        .map_err(|e| request_id.storage_error(e))?;

    tracing::info!(request_id = %request_id, book_id = %id, "Book deleted");
    Ok(Envelope::message("Delete book successfully"))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes mounted under `/books`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/page", get(list_books_page))
        .route("/search", get(search_books))
        .route(
            "/:id",
            get(get_book)
                .put(update_book)
                .patch(update_book)
                .delete(delete_book),
        )
}
