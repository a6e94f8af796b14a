//! Per-subject counting facade for domain entities.

use std::sync::Arc;

use common::Subject;
use view_store::{ViewEvent, ViewStore, WindowStore};

use crate::date::{DateSpec, Expiry};
use crate::error::Result;
use crate::recorder::ViewRecorder;

/// Implemented by domain entities whose page views are counted.
pub trait Viewable {
    /// Returns the subject under which this entity's views are recorded.
    fn subject(&self) -> Subject;

    /// Returns a view counting handle for this entity.
    fn views<S, W>(&self, recorder: &Arc<ViewRecorder<S, W>>) -> SubjectViews<S, W>
    where
        S: ViewStore,
        W: WindowStore,
    {
        SubjectViews::new(self.subject(), Arc::clone(recorder))
    }
}

/// View counting bound to one subject.
///
/// Views added through the handle are attributed to the recorder's current
/// visitor. Date arguments accept either a `DateTime<Utc>` or a token such
/// as `"24h"`.
pub struct SubjectViews<S, W>
where
    S: ViewStore,
    W: WindowStore,
{
    subject: Subject,
    recorder: Arc<ViewRecorder<S, W>>,
}

impl<S, W> SubjectViews<S, W>
where
    S: ViewStore,
    W: WindowStore,
{
    /// Creates a handle for `subject`.
    pub fn new(subject: Subject, recorder: Arc<ViewRecorder<S, W>>) -> Self {
        Self { subject, recorder }
    }

    /// Returns the subject this handle counts.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Total number of views.
    pub async fn page_views(&self) -> Result<u64> {
        self.count(None, None, false).await
    }

    /// Views at or after `since`.
    pub async fn page_views_from(&self, since: impl Into<DateSpec>) -> Result<u64> {
        self.count(Some(since.into()), None, false).await
    }

    /// Views at or before `upto`.
    pub async fn page_views_before(&self, upto: impl Into<DateSpec>) -> Result<u64> {
        self.count(None, Some(upto.into()), false).await
    }

    /// Views between `since` and `upto`, inclusive.
    pub async fn page_views_between(
        &self,
        since: impl Into<DateSpec>,
        upto: impl Into<DateSpec>,
    ) -> Result<u64> {
        self.count(Some(since.into()), Some(upto.into()), false)
            .await
    }

    /// Number of distinct visitors.
    pub async fn unique_page_views(&self) -> Result<u64> {
        self.count(None, None, true).await
    }

    /// Distinct visitors at or after `since`.
    pub async fn unique_page_views_from(&self, since: impl Into<DateSpec>) -> Result<u64> {
        self.count(Some(since.into()), None, true).await
    }

    /// Distinct visitors at or before `upto`.
    pub async fn unique_page_views_before(&self, upto: impl Into<DateSpec>) -> Result<u64> {
        self.count(None, Some(upto.into()), true).await
    }

    /// Distinct visitors between `since` and `upto`, inclusive.
    pub async fn unique_page_views_between(
        &self,
        since: impl Into<DateSpec>,
        upto: impl Into<DateSpec>,
    ) -> Result<u64> {
        self.count(Some(since.into()), Some(upto.into()), true)
            .await
    }

    /// Records a view by the current visitor and returns it.
    pub async fn add_page_view(&self) -> Result<ViewEvent> {
        let visitor = self.recorder.current_visitor();
        self.recorder
            .record_plain_view(&self.subject, &visitor)
            .await
    }

    /// Records a view by the current visitor unless one was already
    /// recorded within a live window. Returns true if recorded.
    pub async fn add_page_view_that_expires_at(&self, expiry: impl Into<Expiry>) -> Result<bool> {
        let visitor = self.recorder.current_visitor();
        self.recorder
            .record_throttled_view(&self.subject, &visitor, expiry.into())
            .await
    }

    async fn count(
        &self,
        since: Option<DateSpec>,
        upto: Option<DateSpec>,
        unique: bool,
    ) -> Result<u64> {
        self.recorder
            .count_views(&self.subject, since, upto, unique)
            .await
    }
}

impl<S, W> Clone for SubjectViews<S, W>
where
    S: ViewStore,
    W: WindowStore,
{
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            recorder: Arc::clone(&self.recorder),
        }
    }
}
