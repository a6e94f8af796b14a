use serde::{Deserialize, Serialize};

/// The entity whose views are being counted.
///
/// A subject is addressed by its kind (e.g. `"article"`) and the identifier
/// of the specific instance (e.g. `"42"`). Both parts are opaque strings so
/// that any storage key scheme can be mapped onto them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject {
    pub subject_type: String,
    pub subject_id: String,
}

impl Subject {
    /// Creates a subject from its type and instance identifier.
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.subject_id)
    }
}

/// Opaque identifier for whoever generated a view.
///
/// Usually the client's network address. The key is never validated or
/// normalised; an empty key is a valid (single) visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorKey(String);

impl VisitorKey {
    /// Creates a visitor key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the key carries no fingerprint at all.
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for VisitorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VisitorKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for VisitorKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<VisitorKey> for String {
    fn from(key: VisitorKey) -> Self {
        key.0
    }
}
