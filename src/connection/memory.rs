//! In-Memory Connections
//!
//! Connections that answer canned result sets, for exercising monitor
//! loops and probes without a running database.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{ConnectionSource, QueryResult, ResultRow, StorageConnection};

/// Connection answering queries from a fixed table of result sets
#[derive(Debug, Default)]
pub struct MemoryConnection {
    url: String,
    results: HashMap<String, Vec<ResultRow>>,
    /// Every query fails with this connectivity fault when set
    fault: Option<String>,
    executed: Vec<String>,
    /// Open-connection counter of the source that handed this out
    live: Option<Arc<AtomicUsize>>,
}

impl MemoryConnection {
    /// Create a connection with no canned results
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            results: HashMap::new(),
            fault: None,
            executed: Vec::new(),
            live: None,
        }
    }

    /// Answer `sql` with `rows`
    pub fn with_result(mut self, sql: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        self.results.insert(sql.into(), rows);
        self
    }

    /// Fail every query as if the server went away
    pub fn with_fault(mut self, reason: impl Into<String>) -> Self {
        self.fault = Some(reason.into());
        self
    }

    /// SQL executed so far, in order
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

impl Clone for MemoryConnection {
    fn clone(&self) -> Self {
        // A clone is a fresh connection, not tracked by any source
        Self {
            url: self.url.clone(),
            results: self.results.clone(),
            fault: self.fault.clone(),
            executed: Vec::new(),
            live: None,
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl StorageConnection for MemoryConnection {
    async fn query(&mut self, sql: &str) -> QueryResult<Vec<ResultRow>> {
        self.executed.push(sql.to_string());

        if let Some(reason) = &self.fault {
            return Err(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                reason.clone(),
            )));
        }

        self.results
            .get(sql)
            .cloned()
            .ok_or_else(|| sqlx::Error::Protocol(format!("no result set for '{}'", sql)))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Hands out clones of a template connection and counts open ones
#[derive(Debug)]
pub struct MemoryConnectionSource {
    template: MemoryConnection,
    /// Acquisition fails with this connectivity fault when set
    fault: Option<String>,
    live: Arc<AtomicUsize>,
}

impl MemoryConnectionSource {
    pub fn new(template: MemoryConnection) -> Self {
        Self {
            template,
            fault: None,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Refuse every acquisition
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            fault: Some(reason.into()),
            ..Self::new(MemoryConnection::default())
        }
    }

    /// Number of handed-out connections not yet dropped
    pub fn open_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionSource for MemoryConnectionSource {
    async fn acquire(&self) -> QueryResult<Box<dyn StorageConnection>> {
        if let Some(reason) = &self.fault {
            return Err(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                reason.clone(),
            )));
        }

        let mut conn = self.template.clone();
        self.live.fetch_add(1, Ordering::SeqCst);
        conn.live = Some(Arc::clone(&self.live));
        Ok(Box::new(conn))
    }
}
