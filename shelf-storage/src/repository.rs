//! Repository trait for book persistence.
//!
//! Handlers never talk to a concrete store; they receive an
//! `Arc<dyn BookRepository>` through application state.

use async_trait::async_trait;
use shelf_core::{Book, BookId, BookPatch, PageRequest, StorageResult};

/// Async persistence contract for books.
///
/// Listing and search results are always ordered by `created_at` then `id`,
/// both ascending, so page boundaries are stable.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Persist a new book and return the stored record.
    async fn insert(&self, book: &Book) -> StorageResult<Book>;

    /// Fetch a book, or `StorageError::NotFound`.
    async fn get_by_id(&self, id: BookId) -> StorageResult<Book>;

    /// Remove a book, or `StorageError::NotFound` if it was already gone.
    async fn delete_by_id(&self, id: BookId) -> StorageResult<()>;

    /// Apply only the supplied fields of `patch` to `book` and return the
    /// stored result. An empty patch returns the current record unchanged.
    async fn update(&self, book: &Book, patch: &BookPatch) -> StorageResult<Book>;

    /// One page of all books.
    async fn list_page(&self, page: PageRequest) -> StorageResult<Vec<Book>>;

    /// One page of books whose title or description contains `query`,
    /// case-insensitively. An empty query matches everything.
    async fn search(&self, query: &str, page: PageRequest) -> StorageResult<Vec<Book>>;

    /// Total number of stored books.
    async fn count(&self) -> StorageResult<u64>;

    /// Cheap connectivity probe used by readiness checks.
    async fn health_check(&self) -> StorageResult<()>;
}
