//! In-memory `BookRepository` used by tests and by the binary when no
//! database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shelf_core::{Book, BookId, BookPatch, PageRequest, StorageError, StorageResult};
use tokio::sync::RwLock;

use crate::repository::BookRepository;

/// Thread-safe map-backed repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookRepository {
    books: Arc<RwLock<HashMap<BookId, Book>>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn page_of<F>(&self, page: PageRequest, filter: F) -> Vec<Book>
    where
        F: Fn(&Book) -> bool,
    {
        let books = self.books.read().await;
        let mut matching: Vec<&Book> = books.values().filter(|b| filter(*b)).collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        matching
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn insert(&self, book: &Book) -> StorageResult<Book> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.id) {
            return Err(StorageError::persistence("insert book", "already exists"));
        }
        books.insert(book.id, book.clone());
        Ok(book.clone())
    }

    async fn get_by_id(&self, id: BookId) -> StorageResult<Book> {
        self.books
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::book_not_found(id))
    }

    async fn delete_by_id(&self, id: BookId) -> StorageResult<()> {
        self.books
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::book_not_found(id))
    }

    async fn update(&self, book: &Book, patch: &BookPatch) -> StorageResult<Book> {
        let mut books = self.books.write().await;
        let stored = books
            .get_mut(&book.id)
            .ok_or_else(|| StorageError::book_not_found(book.id))?;
        patch.apply(stored, Utc::now());
        Ok(stored.clone())
    }

    async fn list_page(&self, page: PageRequest) -> StorageResult<Vec<Book>> {
        Ok(self.page_of(page, |_| true).await)
    }

    async fn search(&self, query: &str, page: PageRequest) -> StorageResult<Vec<Book>> {
        Ok(self.page_of(page, |b| b.matches_query(query)).await)
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.books.read().await.len() as u64)
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
