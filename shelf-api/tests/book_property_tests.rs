//! Property-Based Tests for book ownership and sparse updates
//!
//! Runs generated requests through the full router.

mod support;

use axum::http::{Method, StatusCode};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use shelf_core::BookPatch;
use shelf_test_utils::generators::{
    arb_author_id, arb_book_patch, arb_description, arb_price, arb_title,
};
use support::*;

fn patch_body(patch: &BookPatch) -> Value {
    let mut body = Map::new();
    if let Some(title) = &patch.title {
        body.insert("title".into(), json!(title));
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), json!(description));
    }
    if let Some(price) = patch.price {
        body.insert("price".into(), json!(price));
    }
    Value::Object(body)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The stored owner is always the caller, whatever author id the body names.
    #[test]
    fn prop_create_stamps_caller_as_owner(
        caller in arb_author_id(),
        claimed in arb_author_id(),
        title in arb_title(),
        description in arb_description(),
        price in arb_price(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = TestApp::new();
            let bearer = bearer_for(&test_auth_config(), caller);

            let response = app
                .send(
                    Method::POST,
                    "/api/v1/books",
                    Some(&bearer),
                    Some(json!({
                        "title": title,
                        "description": description,
                        "price": price,
                        "author_id": claimed.to_string(),
                    })),
                )
                .await;

            prop_assert_eq!(response.status, StatusCode::OK);
            prop_assert_eq!(&response.data()["author_id"], &json!(caller.to_string()));
            prop_assert_eq!(&response.data()["price"], &json!(price));
            Ok(())
        })?;
    }

    /// Fields present in the update are applied, absent ones keep their value.
    #[test]
    fn prop_update_is_sparse(
        owner in arb_author_id(),
        title in arb_title(),
        description in arb_description(),
        price in arb_price(),
        patch in arb_book_patch(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = TestApp::new();
            let bearer = bearer_for(&test_auth_config(), owner);
            let id = app
                .create_book(
                    &bearer,
                    json!({"title": title, "description": description, "price": price}),
                )
                .await;

            let response = app
                .send(
                    Method::PATCH,
                    &format!("/api/v1/books/{id}"),
                    Some(&bearer),
                    Some(patch_body(&patch)),
                )
                .await;
            prop_assert_eq!(response.status, StatusCode::OK);
            prop_assert!(response.is_success());

            let stored = app.get(&format!("/api/v1/books/{id}")).await;
            let data = stored.data();
            prop_assert_eq!(&data["title"], &json!(patch.title.clone().unwrap_or(title)));
            prop_assert_eq!(
                &data["description"],
                &json!(patch.description.clone().unwrap_or(description))
            );
            prop_assert_eq!(&data["price"], &json!(patch.price.unwrap_or(price)));
            prop_assert_eq!(&data["author_id"], &json!(owner.to_string()));
            Ok(())
        })?;
    }

    /// A caller who does not own the book can never change it.
    #[test]
    fn prop_non_owner_cannot_update(
        owner in arb_author_id(),
        stranger in arb_author_id(),
        patch in arb_book_patch(),
    ) {
        prop_assume!(owner != stranger);
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = TestApp::new();
            let config = test_auth_config();
            let id = app
                .create_book(
                    &bearer_for(&config, owner),
                    json!({"title": "Kept", "description": "Original", "price": 5}),
                )
                .await;

            let response = app
                .send(
                    Method::PATCH,
                    &format!("/api/v1/books/{id}"),
                    Some(&bearer_for(&config, stranger)),
                    Some(patch_body(&patch)),
                )
                .await;
            prop_assert_eq!(response.status, StatusCode::FORBIDDEN);
            prop_assert_eq!(response.code(), "e-book-002");

            let stored = app.get(&format!("/api/v1/books/{id}")).await;
            prop_assert_eq!(&stored.data()["title"], &json!("Kept"));
            prop_assert_eq!(&stored.data()["price"], &json!(5));
            Ok(())
        })?;
    }
}
