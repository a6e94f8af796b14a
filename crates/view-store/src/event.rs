use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Subject, VisitorKey};

/// Truncates an instant to the microsecond precision stored by PostgreSQL.
///
/// Every timestamp that enters a store passes through this, so both
/// backends compare and return identical instants.
pub fn storage_precision(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(6)
}

/// Unique identifier for a recorded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewEventId(Uuid);

impl ViewEventId {
    /// Creates a new random view ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a view ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ViewEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ViewEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ViewEventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ViewEventId> for Uuid {
    fn from(id: ViewEventId) -> Self {
        id.0
    }
}

/// A single recorded page view.
///
/// Events are append-only: once stored they are never mutated or deleted
/// by this crate. Each event is identified by its `event_id`; repeated views
/// by the same visitor at the same instant are distinct events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    /// Unique identifier for this view.
    pub event_id: ViewEventId,

    /// The entity that was viewed.
    pub subject: Subject,

    /// Who viewed it.
    pub visitor_key: VisitorKey,

    /// When the view happened, at microsecond precision.
    pub occurred_at: DateTime<Utc>,
}

impl ViewEvent {
    /// Creates a new view event with a fresh ID.
    pub fn new(subject: Subject, visitor_key: VisitorKey, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: ViewEventId::new(),
            subject,
            visitor_key,
            occurred_at: storage_precision(occurred_at),
        }
    }
}
