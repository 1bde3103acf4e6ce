//! Search-result caching.
//!
//! [`CacheBackend`] moves bytes with a TTL; [`SearchCache`] layers the
//! lookaside policy on top: read on search, write-through on miss, pattern
//! invalidation on every write to the resource.

pub mod keys;
pub mod memory_backend;
pub mod redis_backend;
pub mod search;
pub mod traits;

pub use keys::{glob_match, search_key, search_pattern};
pub use memory_backend::InMemoryCacheBackend;
pub use redis_backend::RedisCacheBackend;
pub use search::{SearchCache, DEFAULT_SEARCH_TTL};
pub use traits::{CacheBackend, CacheStats};
