//! Shelf Test Utilities
//!
//! Shared test infrastructure for the Shelf workspace:
//! - Proptest generators for ids, books and patches
//! - Fixtures for common scenarios
//! - Test doubles that count or fail repository and cache calls

pub use shelf_core::{
    AuthorId, Book, BookId, BookPatch, CacheError, EntityIdType, PageRequest, StorageError,
    StorageResult, Timestamp,
};
pub use shelf_storage::{
    BookRepository, CacheBackend, InMemoryBookRepository, InMemoryCacheBackend,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Shelf types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_book_id() -> impl Strategy<Value = BookId> {
        arb_uuid().prop_map(BookId::new)
    }

    pub fn arb_author_id() -> impl Strategy<Value = AuthorId> {
        arb_uuid().prop_map(AuthorId::new)
    }

    /// Generate a Timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Non-blank title text.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,39}"
    }

    pub fn arb_description() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ,.]{0,119}"
    }

    pub fn arb_price() -> impl Strategy<Value = i64> {
        0i64..1_000_000
    }

    pub fn arb_book() -> impl Strategy<Value = Book> {
        (
            arb_book_id(),
            arb_title(),
            arb_description(),
            arb_price(),
            arb_author_id(),
            arb_timestamp(),
        )
            .prop_map(|(id, title, description, price, author_id, created_at)| Book {
                id,
                title,
                description,
                price,
                author_id,
                created_at,
                updated_at: created_at,
            })
    }

    /// Patches with any subset of fields present, including zero values.
    pub fn arb_book_patch() -> impl Strategy<Value = BookPatch> {
        (
            proptest::option::of(prop_oneof![Just(String::new()), arb_title()]),
            proptest::option::of(prop_oneof![Just(String::new()), arb_description()]),
            proptest::option::of(prop_oneof![Just(0i64), arb_price()]),
        )
            .prop_map(|(title, description, price)| BookPatch {
                title,
                description,
                price,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// A book owned by `author` created now.
    pub fn book_owned_by(author: AuthorId, title: &str) -> Book {
        Book::new(title, format!("About {title}"), 1000, author, Utc::now())
    }

    /// `count` books for `author`, each one second newer than the last.
    pub fn books_in_creation_order(author: AuthorId, count: usize) -> Vec<Book> {
        let start = Utc::now();
        (0..count)
            .map(|i| {
                Book::new(
                    format!("Book {i}"),
                    format!("Volume {i}"),
                    100 * i as i64,
                    author,
                    start + chrono::Duration::seconds(i as i64),
                )
            })
            .collect()
    }

    /// In-memory repository pre-loaded with `books`.
    pub async fn seeded_repository(books: &[Book]) -> StorageResult<InMemoryBookRepository> {
        let repo = InMemoryBookRepository::new();
        for book in books {
            repo.insert(book).await?;
        }
        Ok(repo)
    }
}

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Per-operation call counters for [`CountingRepository`].
#[derive(Debug, Default)]
pub struct CallCounts {
    pub insert: AtomicU64,
    pub get_by_id: AtomicU64,
    pub delete_by_id: AtomicU64,
    pub update: AtomicU64,
    pub list_page: AtomicU64,
    pub search: AtomicU64,
}

impl CallCounts {
    /// Total calls across every operation.
    pub fn total(&self) -> u64 {
        [
            &self.insert,
            &self.get_by_id,
            &self.delete_by_id,
            &self.update,
            &self.list_page,
            &self.search,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// Repository wrapper that counts calls before delegating.
#[derive(Clone)]
pub struct CountingRepository {
    inner: Arc<dyn BookRepository>,
    counts: Arc<CallCounts>,
}

impl CountingRepository {
    pub fn new(inner: Arc<dyn BookRepository>) -> Self {
        Self {
            inner,
            counts: Arc::new(CallCounts::default()),
        }
    }

    /// Wrap a fresh in-memory repository.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBookRepository::new()))
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }

    pub fn search_calls(&self) -> u64 {
        self.counts.search.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl BookRepository for CountingRepository {
    async fn insert(&self, book: &Book) -> StorageResult<Book> {
        bump(&self.counts.insert);
        self.inner.insert(book).await
    }

    async fn get_by_id(&self, id: BookId) -> StorageResult<Book> {
        bump(&self.counts.get_by_id);
        self.inner.get_by_id(id).await
    }

    async fn delete_by_id(&self, id: BookId) -> StorageResult<()> {
        bump(&self.counts.delete_by_id);
        self.inner.delete_by_id(id).await
    }

    async fn update(&self, book: &Book, patch: &BookPatch) -> StorageResult<Book> {
        bump(&self.counts.update);
        self.inner.update(book, patch).await
    }

    async fn list_page(&self, page: PageRequest) -> StorageResult<Vec<Book>> {
        bump(&self.counts.list_page);
        self.inner.list_page(page).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> StorageResult<Vec<Book>> {
        bump(&self.counts.search);
        self.inner.search(query, page).await
    }

    async fn count(&self) -> StorageResult<u64> {
        self.inner.count().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }
}

/// Repository whose every operation fails with a persistence error.
#[derive(Debug, Clone)]
pub struct FailingRepository {
    reason: String,
}

impl FailingRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self, operation: &'static str) -> StorageResult<T> {
        Err(StorageError::persistence(operation, self.reason.clone()))
    }
}

#[async_trait]
impl BookRepository for FailingRepository {
    async fn insert(&self, _book: &Book) -> StorageResult<Book> {
        self.fail("insert book")
    }

    async fn get_by_id(&self, _id: BookId) -> StorageResult<Book> {
        self.fail("get book")
    }

    async fn delete_by_id(&self, _id: BookId) -> StorageResult<()> {
        self.fail("delete book")
    }

    async fn update(&self, _book: &Book, _patch: &BookPatch) -> StorageResult<Book> {
        self.fail("update book")
    }

    async fn list_page(&self, _page: PageRequest) -> StorageResult<Vec<Book>> {
        self.fail("list books")
    }

    async fn search(&self, _query: &str, _page: PageRequest) -> StorageResult<Vec<Book>> {
        self.fail("search books")
    }

    async fn count(&self) -> StorageResult<u64> {
        self.fail("count books")
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.fail("health check")
    }
}

/// Cache backend that rejects every call with a transport error.
#[derive(Debug, Clone, Default)]
pub struct FailingCacheBackend {
    calls: Arc<AtomicU64>,
}

impl FailingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls attempted against this backend.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        bump(&self.calls);
        Err(CacheError::Transport {
            reason: "connection refused".to_string(),
        })
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        self.fail()
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        self.fail()
    }
}
