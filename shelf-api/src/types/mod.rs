//! API Request and Response Types

// Book types
mod book;
pub use book::*;
