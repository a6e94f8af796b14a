//! Configuration loaded from environment variables.

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::date::DateTransformer;

/// Errors raised while reading configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A date transformer entry is not of the form `token=span`.
    #[error("Invalid date transformer entry '{0}': expected token=<n>(s|m|h|d|w)")]
    InvalidTransformer(String),
}

/// Page-view counter configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL` — PostgreSQL connection string (default: unset, in-memory)
/// - `PAGE_VIEWS_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `PAGE_VIEWS_DATE_TRANSFORMERS` — comma-separated `token=span` entries,
///   e.g. `"24h=1d,7d=1w,14d=2w"` (default: empty)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub date_transformers: DateTransformer,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Malformed transformer entries are logged and skipped.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let date_transformers = lookup("PAGE_VIEWS_DATE_TRANSFORMERS")
            .map(|entries| Self::lenient_transformers(&entries))
            .unwrap_or(defaults.date_transformers);

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: lookup("PAGE_VIEWS_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_connections),
            date_transformers,
        }
    }

    fn lenient_transformers(entries: &str) -> DateTransformer {
        let mut transformer = DateTransformer::new();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match DateTransformer::parse_entry(entry) {
                Ok((token, span)) => transformer.insert(token, span),
                Err(e) => tracing::warn!(error = %e, "skipping date transformer"),
            }
        }
        transformer
    }

    /// Returns the configured date transformer.
    pub fn transformer(&self) -> DateTransformer {
        self.date_transformers.clone()
    }

    /// Returns pool options sized from this configuration.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new().max_connections(self.max_connections)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            date_transformers: DateTransformer::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeDelta;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 5);
        assert!(config.transformer().is_empty());
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 5);
        assert!(config.transformer().is_empty());
    }

    #[test]
    fn test_reads_all_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/views"),
            ("PAGE_VIEWS_MAX_CONNECTIONS", "12"),
            ("PAGE_VIEWS_DATE_TRANSFORMERS", "24h=1d,7d=1w"),
        ]));

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/views")
        );
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.transformer().span("24h"), Some(TimeDelta::days(1)));
        assert_eq!(config.transformer().span("7d"), Some(TimeDelta::weeks(1)));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let config = Config::from_lookup(lookup(&[
            ("PAGE_VIEWS_MAX_CONNECTIONS", "lots"),
            ("PAGE_VIEWS_DATE_TRANSFORMERS", "24h=1d,broken,14d=2w"),
        ]));

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.transformer().len(), 2);
        assert_eq!(config.transformer().span("14d"), Some(TimeDelta::weeks(2)));
    }

    #[test]
    fn test_pool_options_use_max_connections() {
        let config = Config {
            max_connections: 9,
            ..Config::default()
        };
        assert_eq!(config.pool_options().get_max_connections(), 9);
    }
}
