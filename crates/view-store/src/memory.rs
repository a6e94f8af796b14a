use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Result, Subject, ViewEvent, ViewEventId, ViewQuery, ViewStoreError, ViewWindow, VisitorKey,
    store::{ViewStore, WindowStore},
};

/// In-memory view store for testing and single-process use.
///
/// Provides the same interface and the same atomicity guarantees as the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryViewStore {
    views: Arc<RwLock<Vec<ViewEvent>>>,
    windows: Arc<RwLock<HashMap<(Subject, VisitorKey), ViewWindow>>>,
}

impl InMemoryViewStore {
    /// Creates a new empty in-memory view store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of views stored across all subjects.
    pub async fn view_count(&self) -> usize {
        self.views.read().await.len()
    }

    /// Returns the number of windows held, live or expired.
    pub async fn window_count(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Clears all views and windows.
    pub async fn clear(&self) {
        self.views.write().await.clear();
        self.windows.write().await.clear();
    }
}

#[async_trait]
impl ViewStore for InMemoryViewStore {
    async fn append(&self, event: ViewEvent) -> Result<ViewEventId> {
        let mut views = self.views.write().await;

        // Primary key simulation
        if views.iter().any(|v| v.event_id == event.event_id) {
            return Err(ViewStoreError::DuplicateEvent(event.event_id));
        }

        let event_id = event.event_id;
        views.push(event);
        Ok(event_id)
    }

    async fn count_views(&self, query: ViewQuery) -> Result<u64> {
        if query.is_inverted() {
            return Ok(0);
        }

        let views = self.views.read().await;
        let matching = views.iter().filter(|v| query.matches(v));

        let count = if query.unique {
            matching
                .map(|v| v.visitor_key.as_str())
                .collect::<HashSet<_>>()
                .len()
        } else {
            matching.count()
        };

        Ok(count as u64)
    }

    async fn list_views(&self, query: ViewQuery) -> Result<Vec<ViewEvent>> {
        if query.is_inverted() {
            return Ok(Vec::new());
        }

        let views = self.views.read().await;
        let mut matching: Vec<_> = views.iter().filter(|v| query.matches(v)).cloned().collect();
        matching.sort_by_key(|v| v.occurred_at);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl WindowStore for InMemoryViewStore {
    async fn try_open_window(&self, window: ViewWindow, now: DateTime<Utc>) -> Result<bool> {
        // Check and insert under one write lock
        let mut windows = self.windows.write().await;

        if let Some(existing) = windows.get(&window.key())
            && !existing.is_expired(now)
        {
            return Ok(false);
        }

        windows.insert(window.key(), window);
        Ok(true)
    }

    async fn release_window(&self, window: &ViewWindow) -> Result<bool> {
        let mut windows = self.windows.write().await;

        let key = window.key();
        if windows.get(&key) != Some(window) {
            return Ok(false);
        }

        windows.remove(&key);
        Ok(true)
    }

    async fn get_window(
        &self,
        subject: &Subject,
        visitor_key: &VisitorKey,
    ) -> Result<Option<ViewWindow>> {
        let windows = self.windows.read().await;
        Ok(windows
            .get(&(subject.clone(), visitor_key.clone()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::store::ViewStoreExt;

    fn article() -> Subject {
        Subject::new("article", "42")
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn append_single_view() {
        let store = InMemoryViewStore::new();

        let id = store
            .record_view(article(), "v1".into(), at(0))
            .await
            .unwrap();

        let views = store
            .list_views(ViewQuery::for_subject(article()))
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].event_id, id);
    }

    #[tokio::test]
    async fn repeated_views_at_same_instant_are_all_kept() {
        let store = InMemoryViewStore::new();
        for _ in 0..3 {
            store
                .record_view(article(), "v1".into(), at(0))
                .await
                .unwrap();
        }

        assert_eq!(store.total_views(article()).await.unwrap(), 3);
        assert_eq!(store.unique_views(article()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn appending_same_event_twice_is_rejected() {
        let store = InMemoryViewStore::new();
        let event = ViewEvent::new(article(), "v1".into(), at(0));
        store.append(event.clone()).await.unwrap();

        let result = store.append(event.clone()).await;

        assert!(matches!(
            result,
            Err(ViewStoreError::DuplicateEvent(id)) if id == event.event_id
        ));
        assert_eq!(store.view_count().await, 1);
    }

    #[tokio::test]
    async fn count_all_and_unique_views() {
        let store = InMemoryViewStore::new();
        for (i, visitor) in ["v1", "v1", "v1", "v2"].into_iter().enumerate() {
            store
                .record_view(article(), visitor.into(), at(i as i64))
                .await
                .unwrap();
        }

        assert_eq!(store.total_views(article()).await.unwrap(), 4);
        assert_eq!(store.unique_views(article()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_visitor_key_is_one_bucket() {
        let store = InMemoryViewStore::new();
        store
            .record_view(article(), VisitorKey::default(), at(0))
            .await
            .unwrap();
        store
            .record_view(article(), VisitorKey::default(), at(1))
            .await
            .unwrap();
        store
            .record_view(article(), "v1".into(), at(2))
            .await
            .unwrap();

        assert_eq!(store.unique_views(article()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn count_respects_inclusive_bounds() {
        let store = InMemoryViewStore::new();
        for i in 0..5 {
            store
                .record_view(article(), "v1".into(), at(i * 60))
                .await
                .unwrap();
        }

        let query = ViewQuery::for_subject(article()).between(at(60), at(180));
        assert_eq!(store.count_views(query).await.unwrap(), 3);

        let query = ViewQuery::for_subject(article()).since(at(240));
        assert_eq!(store.count_views(query).await.unwrap(), 1);

        let query = ViewQuery::for_subject(article()).upto(at(0));
        assert_eq!(store.count_views(query).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn inverted_range_counts_zero() {
        let store = InMemoryViewStore::new();
        store
            .record_view(article(), "v1".into(), at(0))
            .await
            .unwrap();

        let query = ViewQuery::for_subject(article()).between(at(10), at(-10));
        assert_eq!(store.count_views(query.clone()).await.unwrap(), 0);
        assert_eq!(store.count_views(query.unique()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn counts_are_scoped_to_subject() {
        let store = InMemoryViewStore::new();
        store
            .record_view(article(), "v1".into(), at(0))
            .await
            .unwrap();
        store
            .record_view(Subject::new("product", "42"), "v1".into(), at(0))
            .await
            .unwrap();

        assert_eq!(store.total_views(article()).await.unwrap(), 1);
        assert_eq!(
            store
                .total_views(Subject::new("article", "unknown"))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn list_views_orders_and_paginates() {
        let store = InMemoryViewStore::new();
        for i in [3, 1, 2, 0] {
            store
                .record_view(article(), "v1".into(), at(i))
                .await
                .unwrap();
        }

        let views = store
            .list_views(ViewQuery::for_subject(article()).offset(1).limit(2))
            .await
            .unwrap();

        let times: Vec<_> = views.iter().map(|v| v.occurred_at).collect();
        assert_eq!(times, vec![at(1), at(2)]);
    }

    #[tokio::test]
    async fn window_opens_once_until_expired() {
        let store = InMemoryViewStore::new();
        let window = ViewWindow::new(article(), "v1".into(), at(0) + TimeDelta::hours(24));

        assert!(store.try_open_window(window.clone(), at(0)).await.unwrap());
        assert!(!store.try_open_window(window, at(3600)).await.unwrap());

        let renewed = ViewWindow::new(article(), "v1".into(), at(0) + TimeDelta::hours(49));
        assert!(
            store
                .try_open_window(renewed.clone(), at(0) + TimeDelta::hours(25))
                .await
                .unwrap()
        );

        let stored = store
            .get_window(&article(), &"v1".into())
            .await
            .unwrap();
        assert_eq!(stored, Some(renewed));
        assert_eq!(store.window_count().await, 1);
    }

    #[tokio::test]
    async fn release_removes_only_the_matching_window() {
        let store = InMemoryViewStore::new();
        let opened = ViewWindow::new(article(), "v1".into(), at(3600));
        store.try_open_window(opened.clone(), at(0)).await.unwrap();

        let other = ViewWindow::new(article(), "v1".into(), at(7200));
        assert!(!store.release_window(&other).await.unwrap());
        assert_eq!(store.window_count().await, 1);

        assert!(store.release_window(&opened).await.unwrap());
        assert_eq!(store.window_count().await, 0);
        assert!(store.try_open_window(opened, at(60)).await.unwrap());
    }

    #[tokio::test]
    async fn windows_are_per_visitor() {
        let store = InMemoryViewStore::new();
        let expires = at(3600);

        assert!(
            store
                .try_open_window(ViewWindow::new(article(), "v1".into(), expires), at(0))
                .await
                .unwrap()
        );
        assert!(
            store
                .try_open_window(ViewWindow::new(article(), "v2".into(), expires), at(0))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn concurrent_window_opens_admit_exactly_one() {
        let store = InMemoryViewStore::new();
        let mut handles = Vec::new();

        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let window = ViewWindow::new(article(), "v1".into(), at(3600));
                store.try_open_window(window, at(0)).await.unwrap()
            }));
        }

        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap() {
                opened += 1;
            }
        }
        assert_eq!(opened, 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryViewStore::new();
        store
            .record_view(article(), "v1".into(), at(0))
            .await
            .unwrap();
        store
            .try_open_window(ViewWindow::new(article(), "v1".into(), at(60)), at(0))
            .await
            .unwrap();

        store.clear().await;

        assert_eq!(store.view_count().await, 0);
        assert_eq!(store.window_count().await, 0);
    }
}
