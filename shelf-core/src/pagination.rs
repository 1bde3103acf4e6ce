//! Page/limit parameters shared by listing and search.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Largest page size any caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Page size used when a listing is requested without explicit parameters.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// A validated 1-based page request.
///
/// Deserializing goes through [`PageRequest::new`], so out-of-range values
/// are rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPageRequest")]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct RawPageRequest {
    page: u32,
    limit: u32,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = StorageError;

    fn try_from(raw: RawPageRequest) -> StorageResult<Self> {
        Self::new(raw.page, raw.limit)
    }
}

impl PageRequest {
    /// Build a page request, checking both values are in range.
    pub fn new(page: u32, limit: u32) -> StorageResult<Self> {
        if page == 0 {
            return Err(StorageError::invalid_argument(
                "page",
                "must be a positive integer",
            ));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(StorageError::invalid_argument(
                "limit",
                format!("must be an integer between 1 and {}", MAX_PAGE_LIMIT),
            ));
        }
        Ok(Self { page, limit })
    }

    /// Parse raw query-string values. Missing, non-integer or non-positive
    /// values are rejected.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> StorageResult<Self> {
        let page = parse_positive("page", page)?;
        let limit = parse_positive("limit", limit)?;
        Self::new(page, limit)
    }

    /// First page with the given size.
    pub fn first(limit: u32) -> StorageResult<Self> {
        Self::new(1, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

fn parse_positive(field: &str, raw: Option<&str>) -> StorageResult<u32> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StorageError::invalid_argument(field, "is required"))?;

    match raw.parse::<i64>() {
        Ok(value) if value >= 1 => u32::try_from(value)
            .map_err(|_| StorageError::invalid_argument(field, "is too large")),
        Ok(_) => Err(StorageError::invalid_argument(
            field,
            "must be a positive integer",
        )),
        Err(_) => Err(StorageError::invalid_argument(
            field,
            format!("'{}' is not an integer", raw),
        )),
    }
}
