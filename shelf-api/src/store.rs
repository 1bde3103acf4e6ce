//! Cached Book Store
//!
//! [`BookStore`] wraps the repository and the search cache so that handlers
//! call one object:
//! - writes go to the repository, then drop every cached search page
//! - `search` reads through the cache (cache-aside) and writes misses back
//! - everything else passes straight to the repository
//!
//! Cache failures are absorbed by [`SearchCache`]; only repository errors
//! reach the caller.

use std::sync::Arc;

use shelf_core::{Book, BookId, BookPatch, PageRequest, StorageResult};
use shelf_storage::{BookRepository, CacheStats, SearchCache};

/// Repository plus search cache, shared by all handlers.
#[derive(Clone)]
pub struct BookStore {
    repo: Arc<dyn BookRepository>,
    search_cache: SearchCache,
}

impl BookStore {
    pub fn new(repo: Arc<dyn BookRepository>, search_cache: SearchCache) -> Self {
        Self { repo, search_cache }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.search_cache.stats()
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Persist a new book, then invalidate cached searches.
    pub async fn create(&self, book: &Book) -> StorageResult<Book> {
        let created = self.repo.insert(book).await?;
        self.invalidate_searches().await;
        Ok(created)
    }

    /// Apply a sparse patch to an already-authorized book.
    ///
    /// An empty patch touches neither the repository nor the cache.
    pub async fn update(&self, book: &Book, patch: &BookPatch) -> StorageResult<Book> {
        if patch.is_empty() {
            return Ok(book.clone());
        }
        let updated = self.repo.update(book, patch).await?;
        self.invalidate_searches().await;
        Ok(updated)
    }

    /// Delete an already-authorized book.
    pub async fn delete(&self, id: BookId) -> StorageResult<()> {
        self.repo.delete_by_id(id).await?;
        self.invalidate_searches().await;
        Ok(())
    }

    async fn invalidate_searches(&self) {
        let removed = self.search_cache.invalidate().await;
        tracing::debug!(removed, pattern = %self.search_cache.pattern(), "Search cache invalidated");
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub async fn get(&self, id: BookId) -> StorageResult<Book> {
        self.repo.get_by_id(id).await
    }

    pub async fn list(&self, page: PageRequest) -> StorageResult<Vec<Book>> {
        self.repo.list_page(page).await
    }

    /// Cache-aside search.
    ///
    /// A hit returns without touching the repository. A miss, an unreadable
    /// entry or a cache outage falls through to the repository, and the
    /// result is written back with the configured TTL.
    pub async fn search(&self, query: &str, page: PageRequest) -> StorageResult<Vec<Book>> {
        let key = self.search_cache.key(query, page);

        if let Some(books) = self.search_cache.lookup::<Vec<Book>>(&key).await {
            tracing::debug!(%key, count = books.len(), "Search cache hit");
            return Ok(books);
        }

        tracing::debug!(%key, "Search cache miss");
        let books = self.repo.search(query, page).await?;
        self.search_cache.store(&key, &books).await;
        Ok(books)
    }

    pub async fn count(&self) -> StorageResult<u64> {
        self.repo.count().await
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        self.repo.health_check().await
    }
}

impl std::fmt::Debug for BookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookStore")
            .field("search_cache", &self.search_cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shelf_core::{AuthorId, EntityIdType, BOOK_RESOURCE_KIND};
    use shelf_storage::{InMemoryBookRepository, InMemoryCacheBackend, DEFAULT_SEARCH_TTL};

    fn store() -> (BookStore, Arc<InMemoryCacheBackend>) {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = SearchCache::new(backend.clone(), BOOK_RESOURCE_KIND, DEFAULT_SEARCH_TTL);
        (
            BookStore::new(Arc::new(InMemoryBookRepository::new()), cache),
            backend,
        )
    }

    #[tokio::test]
    async fn test_search_populates_cache_and_writes_clear_it() -> StorageResult<()> {
        let (store, backend) = store();
        let author = AuthorId::now_v7();
        store
            .create(&Book::new("Dune", "Desert", 10, author, Utc::now()))
            .await?;

        let page = PageRequest::new(1, 10)?;
        let found = store.search("dune", page).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(backend.len().await, 1);

        let again = store.search("dune", page).await?;
        assert_eq!(again, found);
        let stats = store.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        store
            .create(&Book::new("Emma", "Regency", 5, author, Utc::now()))
            .await?;
        assert!(backend.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_patch_skips_invalidation() -> StorageResult<()> {
        let (store, backend) = store();
        let book = store
            .create(&Book::new("Dune", "Desert", 10, AuthorId::now_v7(), Utc::now()))
            .await?;
        store.search("", PageRequest::new(1, 10)?).await?;
        assert_eq!(backend.len().await, 1);

        let unchanged = store.update(&book, &BookPatch::default()).await?;
        assert_eq!(unchanged, book);
        assert_eq!(backend.len().await, 1);
        Ok(())
    }
}
