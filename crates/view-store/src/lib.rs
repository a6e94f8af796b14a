//! Append-only storage for page-view events.
//!
//! This crate provides:
//! - [`ViewStore`] for appending view events and counting them
//! - [`WindowStore`] for the atomic "open window if absent or expired" primitive
//! - In-memory and PostgreSQL backends implementing both

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod window;

pub use common::{Subject, VisitorKey};
pub use error::{Result, ViewStoreError};
pub use event::{ViewEvent, ViewEventId, storage_precision};
pub use memory::InMemoryViewStore;
pub use postgres::PostgresViewStore;
pub use query::ViewQuery;
pub use store::{ViewStore, ViewStoreExt, WindowStore};
pub use window::ViewWindow;
