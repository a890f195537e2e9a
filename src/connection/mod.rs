//! Storage Connection Module
//!
//! The narrow view of a live database connection that discovery and
//! datetime probes need: run a query, read rows and columns.

mod memory;
mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::{MemoryConnection, MemoryConnectionSource};
pub use mysql::{MySqlConnectionSource, MySqlStorageConnection};

/// Result type for raw connection operations
pub type QueryResult<T> = std::result::Result<T, sqlx::Error>;

/// A live connection to one storage node
///
/// Connections are never shared across concurrent probes. Anything a
/// `query` call opens (statements, result streams) is released before
/// it returns.
#[async_trait]
pub trait StorageConnection: Send {
    /// Execute a query and collect every row
    async fn query(&mut self, sql: &str) -> QueryResult<Vec<ResultRow>>;

    /// URL the connection was opened with
    fn url(&self) -> &str;
}

/// Source of connections for operations that acquire their own
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Acquire a connection; dropping it releases it
    async fn acquire(&self) -> QueryResult<Box<dyn StorageConnection>>;
}

/// Column value as read from a result row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Check if value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual form of scalar values; `None` for NULL and binary data
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Bytes(_) => None,
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Timestamp(t) => Some(t.to_rfc3339()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row of a result set, columns kept in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, Value)>,
}

impl ResultRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ResultRow::push`]
    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(label, value);
        self
    }

    /// Append a column
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((label.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value at a 1-based column index
    pub fn value(&self, index: usize) -> Option<&Value> {
        index
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .map(|(_, v)| v)
    }

    /// Value of the first column whose label matches, ignoring ASCII case
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, v)| v)
    }

    /// Trimmed, non-empty text of a column
    pub fn text(&self, label: &str) -> Option<String> {
        self.get(label)
            .and_then(Value::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Text of the first label in `labels` that carries any
    pub fn first_text(&self, labels: &[&str]) -> Option<String> {
        labels.iter().find_map(|label| self.text(label))
    }

    /// Iterate over `(label, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, v)| (name.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = ResultRow::new()
            .with("Master_Host", "  10.0.0.5 ")
            .with("Master_Port", 3306u64)
            .with("Last_Error", "")
            .with("Relay_Log_File", None::<String>);

        assert_eq!(row.len(), 4);
        assert_eq!(row.text("master_host"), Some("10.0.0.5".to_string()));
        assert_eq!(row.text("MASTER_PORT"), Some("3306".to_string()));
        assert_eq!(row.text("Last_Error"), None);
        assert_eq!(row.text("Relay_Log_File"), None);
        assert_eq!(row.text("Missing"), None);
        assert_eq!(row.value(2), Some(&Value::UInt(3306)));
        assert_eq!(row.value(0), None);
        assert_eq!(row.value(5), None);
    }

    #[test]
    fn test_first_text_prefers_earlier_labels() {
        let row = ResultRow::new()
            .with("Source_Host", "db-2")
            .with("Master_Host", "db-1");

        assert_eq!(
            row.first_text(&["Master_Host", "Source_Host"]),
            Some("db-1".to_string())
        );
        assert_eq!(row.first_text(&["Nope", "Source_Host"]), Some("db-2".to_string()));
    }
}
