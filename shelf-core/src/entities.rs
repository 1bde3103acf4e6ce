//! Book entity and its sparse update payload.

use serde::{Deserialize, Serialize};

use crate::{AuthorId, BookId, EntityIdType, Timestamp};

/// Resource kind used in cache keys and log fields.
pub const BOOK_RESOURCE_KIND: &str = "books";

/// A stored book.
///
/// `author_id` is stamped once at creation from the caller's identity and is
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    pub author_id: AuthorId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Book {
    /// Build a new book owned by `author_id` with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        price: i64,
        author_id: AuthorId,
        now: Timestamp,
    ) -> Self {
        Self {
            id: BookId::now_v7(),
            title: title.into(),
            description: description.into(),
            price,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `author` owns this book.
    pub fn is_owned_by(&self, author: AuthorId) -> bool {
        self.author_id == author
    }

    /// Case-insensitive substring match on title or description.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// New value of one supplied [`BookPatch`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchValue<'a> {
    Text(&'a str),
    Amount(i64),
}

/// Sparse update for a book.
///
/// `None` means "not supplied" and leaves the stored value untouched.
/// `Some` is applied even when it holds a zero value (`""` or `0`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.price.is_none()
    }

    /// Column name and new value of every supplied field, in column order.
    pub fn changed_fields(&self) -> Vec<(&'static str, PatchValue<'_>)> {
        let mut fields = Vec::with_capacity(3);
        if let Some(title) = &self.title {
            fields.push(("title", PatchValue::Text(title)));
        }
        if let Some(description) = &self.description {
            fields.push(("description", PatchValue::Text(description)));
        }
        if let Some(price) = self.price {
            fields.push(("price", PatchValue::Amount(price)));
        }
        fields
    }

    /// Apply the supplied fields to `book`. Ownership and id are never touched.
    pub fn apply(&self, book: &mut Book, now: Timestamp) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(description) = &self.description {
            book.description = description.clone();
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if !self.is_empty() {
            book.updated_at = now;
        }
    }
}
