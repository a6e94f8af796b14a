//! Visitor identity providers.

use common::VisitorKey;

/// Supplies the visitor key for the request being handled.
///
/// Typically backed by the client's network address. The key is passed
/// through untouched.
pub trait VisitorIdentity: Send + Sync {
    /// Returns the current visitor's key.
    fn visitor_key(&self) -> VisitorKey;
}

/// Always reports the same visitor.
#[derive(Debug, Clone, Default)]
pub struct FixedVisitor(VisitorKey);

impl FixedVisitor {
    /// Creates a provider that always returns `key`.
    pub fn new(key: impl Into<VisitorKey>) -> Self {
        Self(key.into())
    }
}

impl VisitorIdentity for FixedVisitor {
    fn visitor_key(&self) -> VisitorKey {
        self.0.clone()
    }
}
