use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Result, Subject, ViewEvent, ViewEventId, ViewQuery, ViewWindow, VisitorKey};

/// Core trait for page-view log implementations.
///
/// A view store appends view events and answers aggregate queries over
/// them. It performs no deduplication. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Appends a single view event.
    ///
    /// Repeated views by the same visitor at the same instant are all kept.
    /// Fails with [`ViewStoreError::DuplicateEvent`](crate::ViewStoreError::DuplicateEvent)
    /// only if this exact event (same ID) was already appended.
    async fn append(&self, event: ViewEvent) -> Result<ViewEventId>;

    /// Counts the views matching a query.
    ///
    /// If `query.unique` is set, counts distinct visitor keys instead of
    /// views. An inverted range counts as zero.
    async fn count_views(&self, query: ViewQuery) -> Result<u64>;

    /// Lists the views matching a query, oldest first.
    async fn list_views(&self, query: ViewQuery) -> Result<Vec<ViewEvent>>;
}

/// Storage for per-visitor suppression windows.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Opens `window` unless a live window already exists for its tuple.
    ///
    /// The check and the write happen as one atomic step: a missing window
    /// is inserted, an expired one (as of `now`) is replaced. Returns true
    /// if the window was opened and false if a live one suppressed it.
    async fn try_open_window(&self, window: ViewWindow, now: DateTime<Utc>) -> Result<bool>;

    /// Removes `window` if it is still the stored window for its tuple.
    ///
    /// Compare-and-delete on the exact expiry, so a window opened later by
    /// another request is left alone. Returns true if a window was removed.
    /// Used to undo [`try_open_window`](WindowStore::try_open_window) when
    /// the view behind it could not be recorded.
    async fn release_window(&self, window: &ViewWindow) -> Result<bool>;

    /// Gets the current window for a tuple, live or expired.
    async fn get_window(
        &self,
        subject: &Subject,
        visitor_key: &VisitorKey,
    ) -> Result<Option<ViewWindow>>;
}

/// Extension trait providing convenience methods for view stores.
#[async_trait]
pub trait ViewStoreExt: ViewStore {
    /// Records a view of `subject` by `visitor_key` at `occurred_at`.
    async fn record_view(
        &self,
        subject: Subject,
        visitor_key: VisitorKey,
        occurred_at: DateTime<Utc>,
    ) -> Result<ViewEventId> {
        self.append(ViewEvent::new(subject, visitor_key, occurred_at))
            .await
    }

    /// Counts every view of a subject.
    async fn total_views(&self, subject: Subject) -> Result<u64> {
        self.count_views(ViewQuery::for_subject(subject)).await
    }

    /// Counts the distinct visitors of a subject.
    async fn unique_views(&self, subject: Subject) -> Result<u64> {
        self.count_views(ViewQuery::for_subject(subject).unique())
            .await
    }
}

// Blanket implementation for all ViewStore implementations
impl<T: ViewStore + ?Sized> ViewStoreExt for T {}
