//! Database Datetime Service
//!
//! Reads the current time from a storage node: resolve the dialect,
//! resolve its datetime query, run it on a freshly acquired connection and
//! parse column 1 of row 1. Nothing is cached; every call is a round trip.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use super::provider::DatetimeProviderRegistry;
use crate::connection::{ConnectionSource, Value};
use crate::dialect::DialectRegistry;
use crate::error::{DatetimeLoadingCause, Error, Result};

const TYPE: &str = "Database";

/// Naive layouts accepted for text timestamps, read as UTC
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Offset layouts accepted besides RFC 3339
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f %#z"];

/// Time service backed by a database's clock
pub struct DatabaseDatetimeService {
    storage_type: String,
    source: Arc<dyn ConnectionSource>,
    dialects: Arc<DialectRegistry>,
    providers: Arc<DatetimeProviderRegistry>,
}

impl DatabaseDatetimeService {
    /// Service for a storage of dialect `storage_type`, using the built-in registries
    pub fn new(storage_type: impl Into<String>, source: Arc<dyn ConnectionSource>) -> Self {
        Self::with_registries(
            storage_type,
            source,
            Arc::new(DialectRegistry::builtin()),
            Arc::new(DatetimeProviderRegistry::builtin()),
        )
    }

    pub fn with_registries(
        storage_type: impl Into<String>,
        source: Arc<dyn ConnectionSource>,
        dialects: Arc<DialectRegistry>,
        providers: Arc<DatetimeProviderRegistry>,
    ) -> Self {
        Self {
            storage_type: storage_type.into(),
            source,
            dialects,
            providers,
        }
    }

    /// Service whose storage dialect is recognized from a connection URL
    pub fn for_url(
        url: &str,
        source: Arc<dyn ConnectionSource>,
        dialects: Arc<DialectRegistry>,
        providers: Arc<DatetimeProviderRegistry>,
    ) -> Result<Self> {
        let storage_type = dialects.resolve_from_url(url)?.name.clone();
        Ok(Self::with_registries(storage_type, source, dialects, providers))
    }

    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }

    /// Current time according to the storage node
    ///
    /// Registry failures surface as-is; everything after the query text is
    /// known fails with `DatetimeLoading`.
    pub async fn get_datetime(&self) -> Result<DateTime<Utc>> {
        let dialect = self.dialects.resolve(&self.storage_type)?;
        let provider = self.providers.resolve(&self.dialects, &dialect.name)?;
        let sql = provider.datetime_sql();

        tracing::debug!(dialect = %dialect.name, sql, "Loading datetime");
        self.load_datetime(sql).await.map_err(Error::DatetimeLoading)
    }

    async fn load_datetime(&self, sql: &str) -> std::result::Result<DateTime<Utc>, DatetimeLoadingCause> {
        // The connection is dropped, and so released, on every return path
        let mut conn = self
            .source
            .acquire()
            .await
            .map_err(DatetimeLoadingCause::Connect)?;

        let rows = conn.query(sql).await.map_err(|source| DatetimeLoadingCause::Query {
            sql: sql.to_string(),
            source,
        })?;

        let row = rows
            .first()
            .ok_or_else(|| DatetimeLoadingCause::NoRows(sql.to_string()))?;
        let value = row
            .value(1)
            .ok_or_else(|| DatetimeLoadingCause::Unparsable("row has no columns".to_string()))?;

        parse_timestamp(value)
    }

    /// Service type key
    pub fn get_type(&self) -> &'static str {
        TYPE
    }
}

/// Read a column value as a UTC timestamp
pub fn parse_timestamp(value: &Value) -> std::result::Result<DateTime<Utc>, DatetimeLoadingCause> {
    let text = match value {
        Value::Timestamp(t) => return Ok(*t),
        Value::String(s) => s.trim(),
        other => return Err(DatetimeLoadingCause::Unparsable(format!("{:?}", other))),
    };

    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(text, format) {
            return Ok(t.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(DatetimeLoadingCause::Unparsable(text.to_string()))
}
