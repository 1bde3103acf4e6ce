//! Shelf Storage - Repository and Cache Abstractions
//!
//! Defines the [`BookRepository`] persistence contract with an in-memory
//! implementation, and the search cache with in-memory and Redis backends.
//! The Postgres repository lives in shelf-api next to the connection pool.

pub mod cache;
pub mod memory;
pub mod repository;

pub use cache::{
    search_key, CacheBackend, CacheStats, InMemoryCacheBackend, RedisCacheBackend, SearchCache,
    DEFAULT_SEARCH_TTL,
};
pub use memory::InMemoryBookRepository;
pub use repository::BookRepository;
