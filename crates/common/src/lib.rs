//! Shared identifier types for the page-view counter.

pub mod types;

pub use types::{Subject, VisitorKey};
