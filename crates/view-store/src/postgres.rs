use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, Subject, ViewEvent, ViewEventId, ViewQuery, ViewStoreError, ViewWindow, VisitorKey,
    store::{ViewStore, WindowStore},
};

/// PostgreSQL-backed view store implementation.
#[derive(Clone)]
pub struct PostgresViewStore {
    pool: PgPool,
}

impl PostgresViewStore {
    /// Creates a new PostgreSQL view store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("page view migrations applied");
        Ok(())
    }

    fn row_to_view(row: PgRow) -> Result<ViewEvent> {
        Ok(ViewEvent {
            event_id: ViewEventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            subject: Subject::new(
                row.try_get::<String, _>("subject_type")?,
                row.try_get::<String, _>("subject_id")?,
            ),
            visitor_key: VisitorKey::new(row.try_get::<String, _>("visitor_key")?),
            occurred_at: row.try_get("occurred_at")?,
        })
    }

    /// Appends the subject and range filters shared by counting and listing.
    fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ViewQuery) {
        builder
            .push(" WHERE subject_type = ")
            .push_bind(query.subject.subject_type.clone())
            .push(" AND subject_id = ")
            .push_bind(query.subject.subject_id.clone());

        if let Some(since) = query.since {
            builder.push(" AND occurred_at >= ").push_bind(since);
        }
        if let Some(upto) = query.upto {
            builder.push(" AND occurred_at <= ").push_bind(upto);
        }
    }
}

#[async_trait]
impl ViewStore for PostgresViewStore {
    async fn append(&self, event: ViewEvent) -> Result<ViewEventId> {
        sqlx::query(
            r#"
            INSERT INTO page_views (id, subject_type, subject_id, visitor_key, occurred_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(&event.subject.subject_type)
        .bind(&event.subject.subject_id)
        .bind(event.visitor_key.as_str())
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Primary key violation: this exact event was already stored
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("page_views_pkey")
            {
                return ViewStoreError::DuplicateEvent(event.event_id);
            }
            ViewStoreError::Database(e)
        })?;

        Ok(event.event_id)
    }

    async fn count_views(&self, query: ViewQuery) -> Result<u64> {
        if query.is_inverted() {
            return Ok(0);
        }

        // COALESCE keeps a missing key as its own distinct bucket
        let mut builder = QueryBuilder::<Postgres>::new(if query.unique {
            "SELECT COUNT(DISTINCT COALESCE(visitor_key, '')) FROM page_views"
        } else {
            "SELECT COUNT(*) FROM page_views"
        });
        Self::push_filters(&mut builder, &query);

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn list_views(&self, query: ViewQuery) -> Result<Vec<ViewEvent>> {
        if query.is_inverted() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, subject_type, subject_id, visitor_key, occurred_at FROM page_views",
        );
        Self::push_filters(&mut builder, &query);
        builder.push(" ORDER BY occurred_at ASC, id ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_view).collect()
    }
}

#[async_trait]
impl WindowStore for PostgresViewStore {
    async fn try_open_window(&self, window: ViewWindow, now: DateTime<Utc>) -> Result<bool> {
        // Conditional upsert: only an absent or expired window is written
        let opened: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO page_view_windows (subject_type, subject_id, visitor_key, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (subject_type, subject_id, visitor_key) DO UPDATE SET
                expires_at = EXCLUDED.expires_at
            WHERE page_view_windows.expires_at <= $5
            RETURNING 1
            "#,
        )
        .bind(&window.subject.subject_type)
        .bind(&window.subject.subject_id)
        .bind(window.visitor_key.as_str())
        .bind(window.expires_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        tracing::debug!(
            subject = %window.subject,
            visitor_key = %window.visitor_key,
            opened = opened.is_some(),
            "window upsert"
        );
        Ok(opened.is_some())
    }

    async fn release_window(&self, window: &ViewWindow) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM page_view_windows
            WHERE subject_type = $1 AND subject_id = $2 AND visitor_key = $3 AND expires_at = $4
            "#,
        )
        .bind(&window.subject.subject_type)
        .bind(&window.subject.subject_id)
        .bind(window.visitor_key.as_str())
        .bind(window.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_window(
        &self,
        subject: &Subject,
        visitor_key: &VisitorKey,
    ) -> Result<Option<ViewWindow>> {
        let expires_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT expires_at
            FROM page_view_windows
            WHERE subject_type = $1 AND subject_id = $2 AND visitor_key = $3
            "#,
        )
        .bind(&subject.subject_type)
        .bind(&subject.subject_id)
        .bind(visitor_key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(expires_at.map(|expires_at| {
            ViewWindow::new(subject.clone(), visitor_key.clone(), expires_at)
        }))
    }
}
