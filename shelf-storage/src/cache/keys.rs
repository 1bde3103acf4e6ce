//! Cache key layout for search results.
//!
//! Keys look like `search:{kind}:{query}:page:{page}:limit:{limit}` so that a
//! single `search:{kind}*` pattern drops every cached page for a resource.

use shelf_core::PageRequest;

const SEARCH_PREFIX: &str = "search";

/// Key for one page of search results.
pub fn search_key(resource_kind: &str, query: &str, page: PageRequest) -> String {
    format!(
        "{SEARCH_PREFIX}:{resource_kind}:{query}:page:{}:limit:{}",
        page.page(),
        page.limit()
    )
}

/// Pattern matching every search key for `resource_kind`.
pub fn search_pattern(resource_kind: &str) -> String {
    format!("{SEARCH_PREFIX}:{resource_kind}*")
}

/// Redis-style glob match supporting `*` (any run) and `?` (any one char).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_search_key_layout() -> shelf_core::StorageResult<()> {
        let key = search_key("books", "dune", PageRequest::new(2, 10)?);
        assert_eq!(key, "search:books:dune:page:2:limit:10");
        Ok(())
    }

    #[test]
    fn test_pattern_covers_keys() -> shelf_core::StorageResult<()> {
        let pattern = search_pattern("books");
        assert_eq!(pattern, "search:books*");
        assert!(glob_match(&pattern, &search_key("books", "", PageRequest::new(1, 20)?)));
        assert!(!glob_match(&pattern, &search_key("authors", "x", PageRequest::new(1, 20)?)));
        Ok(())
    }

    #[test]
    fn test_glob_match_wildcards() {
        assert!(glob_match("*", ""));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    proptest! {
        #[test]
        fn prop_every_search_key_matches_its_pattern(
            query in ".{0,24}",
            page in 1u32..1000,
            limit in 1u32..=shelf_core::MAX_PAGE_LIMIT,
        ) {
            let request = PageRequest::new(page, limit)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let key = search_key("books", &query, request);
            prop_assert!(glob_match(&search_pattern("books"), &key));
        }
    }
}
