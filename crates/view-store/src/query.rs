use chrono::{DateTime, Utc};

use crate::{Subject, ViewEvent};

/// Builder for view counting and listing queries.
///
/// A query always targets one subject. The optional bounds are inclusive on
/// both ends. A query whose lower bound lies after its upper bound matches
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    /// The subject whose views are queried.
    pub subject: Subject,

    /// Only views at or after this timestamp.
    pub since: Option<DateTime<Utc>>,

    /// Only views at or before this timestamp.
    pub upto: Option<DateTime<Utc>>,

    /// Count distinct visitors instead of views.
    pub unique: bool,

    /// Maximum number of views to return when listing.
    pub limit: Option<usize>,

    /// Number of views to skip when listing.
    pub offset: Option<usize>,
}

impl ViewQuery {
    /// Creates a query over every view of a subject.
    pub fn for_subject(subject: Subject) -> Self {
        Self {
            subject,
            since: None,
            upto: None,
            unique: false,
            limit: None,
            offset: None,
        }
    }

    /// Filters to views at or after this timestamp.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Filters to views at or before this timestamp.
    pub fn upto(mut self, upto: DateTime<Utc>) -> Self {
        self.upto = Some(upto);
        self
    }

    /// Sets both bounds at once.
    pub fn between(self, since: DateTime<Utc>, upto: DateTime<Utc>) -> Self {
        self.since(since).upto(upto)
    }

    /// Counts distinct visitors rather than views.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Limits the number of views returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many views before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the bounds cannot match any timestamp.
    pub fn is_inverted(&self) -> bool {
        matches!((self.since, self.upto), (Some(since), Some(upto)) if since > upto)
    }

    /// Returns true if `event` falls within this query's subject and bounds.
    pub fn matches(&self, event: &ViewEvent) -> bool {
        if event.subject != self.subject {
            return false;
        }
        if let Some(since) = self.since
            && event.occurred_at < since
        {
            return false;
        }
        if let Some(upto) = self.upto
            && event.occurred_at > upto
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn article() -> Subject {
        Subject::new("article", "42")
    }

    #[test]
    fn query_for_subject_has_no_bounds() {
        let query = ViewQuery::for_subject(article());

        assert_eq!(query.subject, article());
        assert!(query.since.is_none());
        assert!(query.upto.is_none());
        assert!(!query.unique);
    }

    #[test]
    fn query_builder_chain() {
        let now = Utc::now();
        let query = ViewQuery::for_subject(article())
            .between(now - TimeDelta::days(1), now)
            .unique()
            .limit(10)
            .offset(5);

        assert_eq!(query.since, Some(now - TimeDelta::days(1)));
        assert_eq!(query.upto, Some(now));
        assert!(query.unique);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn inverted_bounds_are_detected() {
        let now = Utc::now();
        let inverted = ViewQuery::for_subject(article()).between(now, now - TimeDelta::hours(1));
        let equal = ViewQuery::for_subject(article()).between(now, now);

        assert!(inverted.is_inverted());
        assert!(!equal.is_inverted());
        assert!(!ViewQuery::for_subject(article()).since(now).is_inverted());
    }

    #[test]
    fn bounds_are_inclusive() {
        let now = Utc::now();
        let event = ViewEvent::new(article(), "v1".into(), now);

        assert!(ViewQuery::for_subject(article()).between(now, now).matches(&event));
        assert!(
            !ViewQuery::for_subject(article())
                .since(now + TimeDelta::seconds(1))
                .matches(&event)
        );
        assert!(
            !ViewQuery::for_subject(article())
                .upto(now - TimeDelta::seconds(1))
                .matches(&event)
        );
    }

    #[test]
    fn other_subjects_never_match() {
        let event = ViewEvent::new(Subject::new("article", "7"), "v1".into(), Utc::now());
        assert!(!ViewQuery::for_subject(article()).matches(&event));
    }
}
