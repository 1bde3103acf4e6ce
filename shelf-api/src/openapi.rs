//! OpenAPI Specification for the Shelf API
//!
//! Generated with utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use shelf_core::Book;

use crate::error::ErrorCode;
use crate::routes::{book, health};
use crate::types::{CreateBookRequest, UpdateBookRequest};
use crate::validation::Violation;

/// OpenAPI document for the Shelf API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelf API",
        version = "0.1.0",
        description = "Book catalogue with author ownership, pagination and cached search",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Books", description = "Book catalogue; writes require the owning author's bearer token"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        // === Book Routes ===
        book::create_book,
        book::list_books,
        book::list_books_page,
        book::search_books,
        book::get_book,
        book::update_book,
        book::delete_book,

        // === Health Routes ===
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(
        schemas(
            // === Error Types ===
            ErrorCode, Violation,

            // === Book Types ===
            Book, CreateBookRequest, UpdateBookRequest,

            // === Health Types ===
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::RepositoryHealth, health::SearchCacheHealth,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token whose subject is the author id"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_book_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/books",
            "/api/v1/books/page",
            "/api/v1/books/search",
            "/api/v1/books/{id}",
            "/health/ready",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {expected}"
            );
        }
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_to_json() -> Result<(), serde_json::Error> {
        let json = ApiDoc::to_json()?;
        assert!(json.contains("Shelf API"));
        Ok(())
    }
}
