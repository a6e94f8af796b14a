use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Subject, VisitorKey, storage_precision};

/// Suppression window for one visitor on one subject.
///
/// While a window is live, further throttled views by the same visitor on
/// the same subject are not recorded. A window is live strictly before
/// `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewWindow {
    /// The subject the window applies to.
    pub subject: Subject,

    /// The visitor the window applies to.
    pub visitor_key: VisitorKey,

    /// When the window stops suppressing views.
    pub expires_at: DateTime<Utc>,
}

impl ViewWindow {
    /// Creates a new window, at microsecond precision.
    pub fn new(subject: Subject, visitor_key: VisitorKey, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject,
            visitor_key,
            expires_at: storage_precision(expires_at),
        }
    }

    /// Returns true if the window no longer suppresses views at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns the key identifying the window's tuple.
    pub fn key(&self) -> (Subject, VisitorKey) {
        (self.subject.clone(), self.visitor_key.clone())
    }
}
