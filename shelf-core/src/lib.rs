//! Shelf Core - Entity Types
//!
//! Pure data structures shared by every other Shelf crate: identifiers, the
//! `Book` entity, sparse patches, pagination and the error taxonomy.
//! No I/O lives here.

mod entities;
mod error;
mod identity;
mod pagination;

pub use entities::{Book, BookPatch, PatchValue, BOOK_RESOURCE_KIND};
pub use error::{
    CacheError, ConfigError, ErrorKind, ShelfError, ShelfResult, StorageError, StorageResult,
};
pub use identity::{AuthorId, BookId, EntityIdType, Timestamp};
pub use pagination::{PageRequest, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
