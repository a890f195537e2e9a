//! PostgreSQL Streaming Replication
//!
//! Discovery for WAL streaming standbys. Also serves openGauss through
//! its trunk dialect.

use std::any::Any;

use async_trait::async_trait;
use serde::Serialize;

use super::instance::PrimaryDatabaseInstance;
use super::status::HighlyAvailableStatus;
use super::storage_node::{StorageNodeDataSource, StorageNodeStatus};
use super::{execute_probe, parse_flag, probe_first_row, DiscoveryAlgorithm};
use crate::connection::StorageConnection;
use crate::error::{Error, Result};

const TYPE: &str = "PostgreSQL.STREAMING_REPLICATION";

const QUERY_RECOVERY_STATE: &str = "SELECT pg_is_in_recovery() AS in_recovery, \
     (SELECT COUNT(*) FROM pg_stat_replication) AS replica_count";

const QUERY_WAL_RECEIVER: &str =
    "SELECT sender_host, sender_port FROM pg_stat_wal_receiver WHERE status = 'streaming'";

const QUERY_NODE_STATE: &str = "SELECT pg_is_in_recovery() AS in_recovery, \
     EXISTS (SELECT 1 FROM pg_stat_wal_receiver WHERE status = 'streaming') AS streaming";

/// HA status of a PostgreSQL node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamingReplicationStatus {
    /// True on standbys
    pub in_recovery: bool,
    /// Standbys streaming from this node
    pub replica_count: u64,
}

impl HighlyAvailableStatus for StreamingReplicationStatus {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Discovery for PostgreSQL streaming replication
#[derive(Debug, Clone, Default)]
pub struct PostgresStreamingReplication;

impl PostgresStreamingReplication {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiscoveryAlgorithm for PostgresStreamingReplication {
    async fn load_highly_available_status(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<Box<dyn HighlyAvailableStatus>> {
        let row = probe_first_row(TYPE, conn, QUERY_RECOVERY_STATE).await?;

        let replica_count = match row.text("replica_count") {
            Some(count) => count.parse::<u64>().map_err(|_| {
                Error::malformed(TYPE, format!("replica count is not a number: '{}'", count))
            })?,
            None => 0,
        };

        Ok(Box::new(StreamingReplicationStatus {
            in_recovery: parse_flag(TYPE, &row, "in_recovery")?,
            replica_count,
        }))
    }

    async fn find_primary_instance(
        &self,
        data_source_name: &str,
        conn: &mut dyn StorageConnection,
    ) -> Result<Option<PrimaryDatabaseInstance>> {
        // Only a streaming WAL receiver knows its upstream
        let rows = execute_probe(conn, QUERY_WAL_RECEIVER).await?;
        let Some(row) = rows.first() else {
            tracing::debug!(data_source_name, "No streaming WAL receiver");
            return Ok(None);
        };

        PrimaryDatabaseInstance::from_row(TYPE, row, &["sender_host"], &["sender_port"]).map(Some)
    }

    async fn storage_node_data_source(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<StorageNodeDataSource> {
        let row = probe_first_row(TYPE, conn, QUERY_NODE_STATE).await?;

        if !parse_flag(TYPE, &row, "in_recovery")? {
            return Ok(StorageNodeDataSource::primary(StorageNodeStatus::Enabled));
        }

        let status = if parse_flag(TYPE, &row, "streaming")? {
            StorageNodeStatus::Enabled
        } else {
            StorageNodeStatus::Disabled
        };
        Ok(StorageNodeDataSource::member(status))
    }

    fn type_name(&self) -> &str {
        TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{MemoryConnection, ResultRow};
    use crate::discovery::StorageNodeRole;

    fn standby(streaming: bool) -> MemoryConnection {
        let receiver = if streaming {
            vec![ResultRow::new()
                .with("sender_host", "pg-primary")
                .with("sender_port", 5432i64)]
        } else {
            vec![]
        };

        MemoryConnection::new("jdbc:postgresql://pg-standby:5432/app")
            .with_result(
                QUERY_RECOVERY_STATE,
                vec![ResultRow::new().with("in_recovery", true).with("replica_count", 0i64)],
            )
            .with_result(QUERY_WAL_RECEIVER, receiver)
            .with_result(
                QUERY_NODE_STATE,
                vec![ResultRow::new().with("in_recovery", "t").with("streaming", streaming)],
            )
    }

    #[tokio::test]
    async fn test_streaming_standby() {
        let algorithm = PostgresStreamingReplication::new();
        let mut conn = standby(true);

        let status = algorithm.load_highly_available_status(&mut conn).await.unwrap();
        let status = status.downcast_ref::<StreamingReplicationStatus>().unwrap();
        assert!(status.in_recovery);

        let primary = algorithm.find_primary_instance("pg_0", &mut conn).await.unwrap();
        assert_eq!(primary, Some(PrimaryDatabaseInstance::address("pg-primary", 5432)));

        let node = algorithm.storage_node_data_source(&mut conn).await.unwrap();
        assert_eq!(node, StorageNodeDataSource::member(StorageNodeStatus::Enabled));
    }

    #[tokio::test]
    async fn test_disconnected_standby() {
        let algorithm = PostgresStreamingReplication::new();
        let mut conn = standby(false);

        assert_eq!(algorithm.find_primary_instance("pg_0", &mut conn).await.unwrap(), None);
        let node = algorithm.storage_node_data_source(&mut conn).await.unwrap();
        assert_eq!(node.status, StorageNodeStatus::Disabled);
    }

    #[tokio::test]
    async fn test_primary_node() {
        let mut conn = MemoryConnection::new("jdbc:postgresql://pg-primary/app")
            .with_result(
                QUERY_NODE_STATE,
                vec![ResultRow::new().with("in_recovery", false).with("streaming", false)],
            )
            .with_result(
                QUERY_RECOVERY_STATE,
                vec![ResultRow::new().with("in_recovery", "f").with("replica_count", 2i64)],
            );
        let algorithm = PostgresStreamingReplication::new();

        let node = algorithm.storage_node_data_source(&mut conn).await.unwrap();
        assert_eq!(node.role, StorageNodeRole::Primary);

        let status = algorithm.load_highly_available_status(&mut conn).await.unwrap();
        assert_eq!(status.to_json()["replica_count"], 2);
    }
}
