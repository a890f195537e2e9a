//! Discovery Module
//!
//! Pluggable algorithms that probe one storage node over a live connection
//! and report its HA status, the primary it follows, and its own role.
//!
//! # Algorithms
//!
//! | Type                              | Topology                         |
//! |-----------------------------------|----------------------------------|
//! | `MySQL.NORMAL_REPLICATION`        | Asynchronous source/replica      |
//! | `MySQL.MGR`                       | MySQL group replication          |
//! | `PostgreSQL.STREAMING_REPLICATION`| WAL streaming replication        |
//! | `CORE.FIXTURE`                    | Canned answers, no queries       |
//!
//! Branch dialects (MariaDB, openGauss) reuse their trunk's algorithms via
//! [`DiscoveryAlgorithmRegistry::resolve`].
//!
//! Algorithms are immutable after construction and are shared across
//! concurrent probes. Each probe brings its own connection.

mod fixture;
mod instance;
mod mysql_group;
mod mysql_replication;
mod postgres_streaming;
mod registry;
mod status;
mod storage_node;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::connection::{ResultRow, StorageConnection};
use crate::error::{Error, Result};

pub use fixture::{FixtureDiscoveryAlgorithm, FixtureStatus};
pub use instance::PrimaryDatabaseInstance;
pub use mysql_group::{GroupReplicationStatus, MySqlGroupReplication};
pub use mysql_replication::{MySqlNormalReplication, NormalReplicationStatus};
pub use postgres_streaming::{PostgresStreamingReplication, StreamingReplicationStatus};
pub use registry::DiscoveryAlgorithmRegistry;
pub use status::HighlyAvailableStatus;
pub use storage_node::{StorageNodeDataSource, StorageNodeRole, StorageNodeStatus};

/// A discovery algorithm for one dialect and replication topology
#[async_trait]
pub trait DiscoveryAlgorithm: Send + Sync {
    /// Run the topology query and parse its first row
    ///
    /// Fails with `NoTopologyData` when the query returns no rows.
    async fn load_highly_available_status(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<Box<dyn HighlyAvailableStatus>>;

    /// The primary as seen from this node
    ///
    /// `Ok(None)` means no primary relationship applies here, which is a
    /// normal state. A row that names a primary without a usable host and
    /// port fails with `MalformedTopologyData`.
    async fn find_primary_instance(
        &self,
        data_source_name: &str,
        conn: &mut dyn StorageConnection,
    ) -> Result<Option<PrimaryDatabaseInstance>>;

    /// Classify this node without any cluster-wide knowledge
    async fn storage_node_data_source(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<StorageNodeDataSource>;

    /// Registry key, stable across versions
    fn type_name(&self) -> &str;
}

/// Tunables shared by the built-in algorithms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryProps {
    /// Replicas further behind than this are reported DISABLED
    #[serde(default)]
    pub max_replication_delay_secs: Option<u64>,
}

/// Run a probe query, mapping failures to `ProbeExecution`
pub(crate) async fn execute_probe(conn: &mut dyn StorageConnection, sql: &str) -> Result<Vec<ResultRow>> {
    tracing::debug!(sql, "Executing probe");
    conn.query(sql).await.map_err(|source| Error::ProbeExecution {
        sql: sql.to_string(),
        source,
    })
}

/// First row of a probe query; no rows is `NoTopologyData`
pub(crate) async fn probe_first_row(
    algorithm: &str,
    conn: &mut dyn StorageConnection,
    sql: &str,
) -> Result<ResultRow> {
    execute_probe(conn, sql)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoTopologyData {
            algorithm: algorithm.to_string(),
            sql: sql.to_string(),
        })
}

/// Boolean column that may come back as a bool, a number or text
pub(crate) fn parse_flag(algorithm: &str, row: &ResultRow, label: &str) -> Result<bool> {
    let text = row
        .text(label)
        .ok_or_else(|| Error::malformed(algorithm, format!("column {} is missing", label)))?;

    match text.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::malformed(
            algorithm,
            format!("column {} is not a boolean: '{}'", label, other),
        )),
    }
}
