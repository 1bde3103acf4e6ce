//! Book-related API types

use serde::{Deserialize, Serialize};
use shelf_core::{AuthorId, Book, BookPatch, PageRequest, StorageResult, Timestamp};

use crate::error::ApiResult;
use crate::validation::{HasUpdates, Validate, Validator};

/// Request to create a book.
///
/// The owner is taken from the caller's identity; an `author_id` in the body
/// is ignored like any other unknown field. Missing strings deserialize as
/// empty so that they are reported by the `required` rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBookRequest {
    /// Book title
    #[serde(default)]
    pub title: String,
    /// Book description
    #[serde(default)]
    pub description: String,
    /// Price in minor currency units (defaults to 0)
    #[serde(default)]
    pub price: Option<i64>,
}

impl CreateBookRequest {
    /// Build the stored record owned by `author_id`.
    pub fn into_book(self, author_id: AuthorId, now: Timestamp) -> Book {
        Book::new(
            self.title,
            self.description,
            self.price.unwrap_or(0),
            author_id,
            now,
        )
    }
}

impl Validate for CreateBookRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        v.required("title", &self.title)
            .required("description", &self.description)
            .non_negative("price", self.price.unwrap_or(0));
        v.finish()
    }
}

/// Request to update a book. Absent and `null` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateBookRequest {
    /// New title (if changing)
    #[serde(default)]
    pub title: Option<String>,
    /// New description (if changing)
    #[serde(default)]
    pub description: Option<String>,
    /// New price (if changing)
    #[serde(default)]
    pub price: Option<i64>,
}

impl UpdateBookRequest {
    pub fn into_patch(self) -> BookPatch {
        BookPatch {
            title: self.title,
            description: self.description,
            price: self.price,
        }
    }
}

impl Validate for UpdateBookRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut v = Validator::new();
        if let Some(price) = self.price {
            v.check(
                "price",
                "updatePrice",
                price >= 0,
                "Field 'price' must not be negative",
            );
        }
        v.finish()
    }
}

impl HasUpdates for UpdateBookRequest {
    fn has_any_updates(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.price.is_some()
    }
}

/// Raw `page` / `limit` query parameters.
///
/// Kept as strings so that malformed values surface as InvalidArgument
/// envelopes instead of axum's plain-text query rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    /// Both parameters are required.
    pub fn page_request(&self) -> StorageResult<PageRequest> {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }

    /// Missing parameters fall back to the first page of `default_limit`;
    /// supplied ones must still be valid.
    pub fn page_request_or_default(&self, default_limit: u32) -> StorageResult<PageRequest> {
        if self.page.is_none() && self.limit.is_none() {
            return PageRequest::first(default_limit);
        }
        let page = self.page.as_deref().unwrap_or("1");
        let limit = self.limit.clone().unwrap_or_else(|| default_limit.to_string());
        PageRequest::parse(Some(page), Some(&limit))
    }
}

/// Raw search query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Text to match against title or description. Absent means everything.
    #[serde(default)]
    pub q: String,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl SearchQuery {
    pub fn page_request(&self) -> StorageResult<PageRequest> {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }
}
