//! OpenAPI Specification Generator Binary
//!
//! Writes the Shelf OpenAPI specification as JSON to stdout.
//!
//! Usage:
//!   cargo run -p shelf-api --bin generate-openapi > openapi.json

use shelf_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
