//! MySQL / MariaDB Connections
//!
//! Adapts sqlx MySQL connections to [`StorageConnection`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Executor, MySql, MySqlPool, Row, TypeInfo, ValueRef};

use super::{ConnectionSource, QueryResult, ResultRow, StorageConnection, Value};
use crate::error::Result;

/// A pooled sqlx MySQL connection
pub struct MySqlStorageConnection {
    conn: PoolConnection<MySql>,
    url: String,
}

impl MySqlStorageConnection {
    pub fn new(conn: PoolConnection<MySql>, url: impl Into<String>) -> Self {
        Self {
            conn,
            url: url.into(),
        }
    }
}

#[async_trait]
impl StorageConnection for MySqlStorageConnection {
    async fn query(&mut self, sql: &str) -> QueryResult<Vec<ResultRow>> {
        // Plain &str goes over the text protocol, which every SHOW statement supports
        let rows = (&mut *self.conn).fetch_all(sql).await?;
        rows.iter().map(decode_row).collect()
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Connection source backed by a sqlx pool
#[derive(Clone)]
pub struct MySqlConnectionSource {
    pool: MySqlPool,
    url: String,
}

impl MySqlConnectionSource {
    /// Build a lazily connecting pool; no connection is opened until first use
    pub fn connect_lazy(url: &str, connect_timeout: Duration, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect_lazy(&driver_url(url))?;

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool, url: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
        }
    }

    /// Acquire a concrete connection
    pub async fn acquire_mysql(&self) -> QueryResult<MySqlStorageConnection> {
        let conn = self.pool.acquire().await?;
        Ok(MySqlStorageConnection::new(conn, self.url.clone()))
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConnectionSource for MySqlConnectionSource {
    async fn acquire(&self) -> QueryResult<Box<dyn StorageConnection>> {
        Ok(Box::new(self.acquire_mysql().await?))
    }
}

/// Rewrite a configured URL into one the sqlx MySQL driver accepts
///
/// `jdbc:` prefixes are dropped and the `mysqlx` / `mariadb` schemes map
/// onto `mysql`.
pub fn driver_url(url: &str) -> String {
    let trimmed = url.strip_prefix("jdbc:").unwrap_or(url);
    for scheme in ["mysqlx:", "mariadb:"] {
        if let Some(rest) = trimmed.strip_prefix(scheme) {
            return format!("mysql:{}", rest);
        }
    }
    trimmed.to_string()
}

fn decode_row(row: &MySqlRow) -> QueryResult<ResultRow> {
    let mut result = ResultRow::new();
    for column in row.columns() {
        let value = decode_value(row, column.ordinal(), column.type_info().name())?;
        result.push(column.name(), value);
    }
    Ok(result)
}

fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> QueryResult<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Value::Int(row.try_get(index)?),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::UInt(row.try_get(index)?),
        "FLOAT" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::Float(row.try_get(index)?),
        "DATETIME" | "TIMESTAMP" => Value::Timestamp(row.try_get(index)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            Value::Bytes(row.try_get(index)?)
        }
        _ => match row.try_get::<String, _>(index) {
            Ok(s) => Value::String(s),
            // DATE, TIME, DECIMAL and friends arrive as text
            Err(_) => {
                let raw: Vec<u8> = row.try_get_unchecked(index)?;
                Value::String(String::from_utf8_lossy(&raw).into_owned())
            }
        },
    };

    Ok(value)
}
