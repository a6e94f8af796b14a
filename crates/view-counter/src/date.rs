//! Date values and relative date tokens.
//!
//! Query bounds and expiry dates are either absolute timestamps or short
//! tokens such as `"24h"` that a [`DateTransformer`] maps to a span of time
//! relative to now. Tokens without a mapping are parsed as literal
//! timestamps.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::config::ConfigError;
use crate::error::{Result, ViewCounterError};

/// A query bound: an absolute instant or a token to resolve against now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpec {
    At(DateTime<Utc>),
    Token(String),
}

impl From<DateTime<Utc>> for DateSpec {
    fn from(instant: DateTime<Utc>) -> Self {
        DateSpec::At(instant)
    }
}

impl From<&str> for DateSpec {
    fn from(token: &str) -> Self {
        DateSpec::Token(token.to_string())
    }
}

impl From<String> for DateSpec {
    fn from(token: String) -> Self {
        DateSpec::Token(token)
    }
}

/// When a throttled view's suppression window ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// At a fixed instant.
    At(DateTime<Utc>),
    /// A fixed span after now.
    In(TimeDelta),
    /// A token resolved to a span after now, or a literal timestamp.
    Token(String),
}

impl From<DateTime<Utc>> for Expiry {
    fn from(instant: DateTime<Utc>) -> Self {
        Expiry::At(instant)
    }
}

impl From<TimeDelta> for Expiry {
    fn from(span: TimeDelta) -> Self {
        Expiry::In(span)
    }
}

impl From<&str> for Expiry {
    fn from(token: &str) -> Self {
        Expiry::Token(token.to_string())
    }
}

impl From<String> for Expiry {
    fn from(token: String) -> Self {
        Expiry::Token(token)
    }
}

/// Parses a span such as `"30m"`, `"24h"`, `"7d"` or `"2w"`.
///
/// Units are `s`, `m`, `h`, `d` and `w`. Returns `None` for anything else,
/// including negative amounts and spans too large for a `TimeDelta`. A span
/// that fits may still overflow once applied to a timestamp; resolving it
/// then fails with [`ViewCounterError::DateOutOfRange`].
pub fn parse_span(input: &str) -> Option<TimeDelta> {
    let input = input.trim();
    let unit = input.chars().last()?;
    let amount: i64 = input[..input.len() - unit.len_utf8()].parse().ok()?;
    if amount < 0 {
        return None;
    }

    match unit {
        's' => TimeDelta::try_seconds(amount),
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => None,
    }
}

/// Parses a literal timestamp: RFC 3339, or a naive date/datetime taken as UTC.
fn parse_literal(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Mapping from short tokens to spans of time.
///
/// As a query bound a token means "that long ago"; as an expiry it means
/// "that long from now". Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTransformer {
    spans: HashMap<String, TimeDelta>,
}

impl DateTransformer {
    /// Creates a transformer with no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token mapping.
    pub fn with(mut self, token: impl Into<String>, span: TimeDelta) -> Self {
        self.insert(token, span);
        self
    }

    /// Adds or replaces a token mapping.
    pub fn insert(&mut self, token: impl Into<String>, span: TimeDelta) {
        self.spans.insert(token.into(), span);
    }

    /// Parses a comma-separated list of `token=span` entries.
    ///
    /// ```
    /// use view_counter::DateTransformer;
    ///
    /// let transformer = DateTransformer::parse("24h=1d, 7d=1w").unwrap();
    /// assert_eq!(transformer.len(), 2);
    /// ```
    pub fn parse(entries: &str) -> std::result::Result<Self, ConfigError> {
        let mut transformer = Self::new();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, span) = Self::parse_entry(entry)?;
            transformer.insert(token, span);
        }
        Ok(transformer)
    }

    /// Parses one `token=span` entry.
    pub fn parse_entry(entry: &str) -> std::result::Result<(String, TimeDelta), ConfigError> {
        let invalid = || ConfigError::InvalidTransformer(entry.to_string());

        let (token, span) = entry.split_once('=').ok_or_else(invalid)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid());
        }
        let span = parse_span(span).ok_or_else(invalid)?;

        Ok((token.to_string(), span))
    }

    /// Returns the span mapped to `token`, if any.
    pub fn span(&self, token: &str) -> Option<TimeDelta> {
        self.spans.get(token).copied()
    }

    /// Returns the number of configured tokens.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns true if no tokens are configured.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Resolves a query bound to an absolute instant.
    pub fn resolve(&self, spec: &DateSpec, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match spec {
            DateSpec::At(instant) => Ok(*instant),
            DateSpec::Token(token) => match self.span(token) {
                Some(span) => now
                    .checked_sub_signed(span)
                    .ok_or_else(|| ViewCounterError::DateOutOfRange(token.clone())),
                None => Self::literal(token),
            },
        }
    }

    /// Resolves an expiry to the absolute instant the window ends.
    pub fn resolve_expiry(&self, expiry: &Expiry, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match expiry {
            Expiry::At(instant) => Ok(*instant),
            Expiry::In(span) => now
                .checked_add_signed(*span)
                .ok_or_else(|| ViewCounterError::DateOutOfRange(span.to_string())),
            Expiry::Token(token) => match self.span(token) {
                Some(span) => now
                    .checked_add_signed(span)
                    .ok_or_else(|| ViewCounterError::DateOutOfRange(token.clone())),
                None => Self::literal(token),
            },
        }
    }

    fn literal(token: &str) -> Result<DateTime<Utc>> {
        parse_literal(token).ok_or_else(|| ViewCounterError::UnresolvedDateToken(token.to_string()))
    }
}
