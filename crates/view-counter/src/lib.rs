//! Page-view recording policy and counting facade.
//!
//! This crate provides the write-side policy and query surface on top of
//! the `view-store` crate:
//! - [`ViewRecorder`] for plain and throttled (once-per-window) views
//! - [`DateTransformer`] for resolving relative date tokens such as `"24h"`
//! - [`SubjectViews`] for attaching view counting to domain entities
//! - [`Config`] for environment-driven configuration

pub mod clock;
pub mod config;
pub mod date;
pub mod error;
pub mod recorder;
pub mod subject;
pub mod visitor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use common::{Subject, VisitorKey};
pub use config::{Config, ConfigError};
pub use date::{DateSpec, DateTransformer, Expiry, parse_span};
pub use error::{Result, ViewCounterError};
pub use recorder::ViewRecorder;
pub use subject::{SubjectViews, Viewable};
pub use visitor::{FixedVisitor, VisitorIdentity};
