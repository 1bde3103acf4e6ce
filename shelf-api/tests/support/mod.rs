//! Shared helpers for the router-level integration tests.
#![allow(dead_code)]

pub mod app;
pub mod auth;

pub use app::*;
pub use auth::*;
