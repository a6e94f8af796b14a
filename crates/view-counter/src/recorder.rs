//! View recording policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Subject, VisitorKey};
use view_store::{ViewEvent, ViewQuery, ViewStore, ViewWindow, WindowStore, storage_precision};

use crate::clock::{Clock, SystemClock};
use crate::date::{DateSpec, DateTransformer, Expiry};
use crate::error::Result;
use crate::visitor::VisitorIdentity;

/// Decides whether a view counts, and records it if so.
///
/// The recorder is the only writer of view events and suppression windows.
/// All collaborators are passed in explicitly: the view log, the window
/// store, the visitor identity provider, and optionally a clock and a date
/// transformer.
pub struct ViewRecorder<S, W>
where
    S: ViewStore,
    W: WindowStore,
{
    store: S,
    windows: W,
    visitors: Arc<dyn VisitorIdentity>,
    clock: Arc<dyn Clock>,
    transformer: DateTransformer,
}

impl<S, W> ViewRecorder<S, W>
where
    S: ViewStore,
    W: WindowStore,
{
    /// Creates a recorder using the system clock and no date tokens.
    pub fn new(store: S, windows: W, visitors: impl VisitorIdentity + 'static) -> Self {
        Self {
            store,
            windows,
            visitors: Arc::new(visitors),
            clock: Arc::new(SystemClock),
            transformer: DateTransformer::new(),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the date transformer.
    pub fn with_transformer(mut self, transformer: DateTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Returns a reference to the underlying view store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the underlying window store.
    pub fn windows(&self) -> &W {
        &self.windows
    }

    /// Returns the date transformer in use.
    pub fn transformer(&self) -> &DateTransformer {
        &self.transformer
    }

    /// Returns the recorder's notion of now, at storage precision.
    pub fn now(&self) -> DateTime<Utc> {
        storage_precision(self.clock.now())
    }

    /// Returns the key of the visitor behind the current request.
    pub fn current_visitor(&self) -> VisitorKey {
        self.visitors.visitor_key()
    }

    /// Records a view unconditionally and returns it.
    #[tracing::instrument(skip(self))]
    pub async fn record_plain_view(
        &self,
        subject: &Subject,
        visitor_key: &VisitorKey,
    ) -> Result<ViewEvent> {
        self.append_at(subject, visitor_key, self.now()).await
    }

    /// Records a view unless the visitor already has a live window on the
    /// subject.
    ///
    /// Returns true if the view was recorded and a new window opened, false
    /// if it was suppressed. The window check-and-open is a single atomic
    /// store operation, so concurrent calls for the same visitor and subject
    /// record at most one view per window. If the view cannot be stored the
    /// window is released again, so a retry is not suppressed.
    #[tracing::instrument(skip(self))]
    pub async fn record_throttled_view(
        &self,
        subject: &Subject,
        visitor_key: &VisitorKey,
        expiry: Expiry,
    ) -> Result<bool> {
        let now = self.now();
        let expires_at = self.transformer.resolve_expiry(&expiry, now)?;
        if expires_at <= now {
            tracing::debug!(%expires_at, "window expires immediately");
        }

        let window = ViewWindow::new(subject.clone(), visitor_key.clone(), expires_at);
        if !self.windows.try_open_window(window.clone(), now).await? {
            metrics::counter!(
                "page_views_suppressed_total",
                "subject_type" => subject.subject_type.clone()
            )
            .increment(1);
            tracing::debug!("view suppressed by live window");
            return Ok(false);
        }

        if let Err(err) = self.append_at(subject, visitor_key, now).await {
            match self.windows.release_window(&window).await {
                Ok(released) => tracing::debug!(released, "window released after failed append"),
                Err(release_err) => {
                    tracing::warn!(error = %release_err, "failed to release window after failed append")
                }
            }
            return Err(err);
        }
        Ok(true)
    }

    /// Counts views of a subject, resolving date tokens against now.
    ///
    /// Both bounds are inclusive. A lower bound after the upper bound
    /// counts as zero.
    #[tracing::instrument(skip(self))]
    pub async fn count_views(
        &self,
        subject: &Subject,
        since: Option<DateSpec>,
        upto: Option<DateSpec>,
        unique: bool,
    ) -> Result<u64> {
        let query = self.build_query(subject, since, upto)?;
        let query = if unique { query.unique() } else { query };

        let count = self.store.count_views(query).await?;
        metrics::counter!("page_view_counts_total").increment(1);
        tracing::debug!(count, "counted views");

        Ok(count)
    }

    /// Lists views of a subject, oldest first, resolving date tokens against now.
    #[tracing::instrument(skip(self))]
    pub async fn list_views(
        &self,
        subject: &Subject,
        since: Option<DateSpec>,
        upto: Option<DateSpec>,
    ) -> Result<Vec<ViewEvent>> {
        let query = self.build_query(subject, since, upto)?;
        Ok(self.store.list_views(query).await?)
    }

    fn build_query(
        &self,
        subject: &Subject,
        since: Option<DateSpec>,
        upto: Option<DateSpec>,
    ) -> Result<ViewQuery> {
        let now = self.now();
        let mut query = ViewQuery::for_subject(subject.clone());

        if let Some(since) = since {
            query = query.since(self.transformer.resolve(&since, now)?);
        }
        if let Some(upto) = upto {
            query = query.upto(self.transformer.resolve(&upto, now)?);
        }

        Ok(query)
    }

    async fn append_at(
        &self,
        subject: &Subject,
        visitor_key: &VisitorKey,
        occurred_at: DateTime<Utc>,
    ) -> Result<ViewEvent> {
        let event = ViewEvent::new(subject.clone(), visitor_key.clone(), occurred_at);
        self.store.append(event.clone()).await?;

        metrics::counter!(
            "page_views_recorded_total",
            "subject_type" => subject.subject_type.clone()
        )
        .increment(1);
        tracing::debug!(event_id = %event.event_id, "view recorded");

        Ok(event)
    }
}
