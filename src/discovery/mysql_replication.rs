//! MySQL Normal Replication
//!
//! Discovery for asynchronous source/replica topologies, driven by the
//! replica status command. Works unchanged against MariaDB.
//!
//! Column names changed in MySQL 8.0.22 (`Master_*` became `Source_*`,
//! `Slave_*` became `Replica_*`); both families are accepted.

use std::any::Any;

use async_trait::async_trait;
use serde::Serialize;

use super::instance::PrimaryDatabaseInstance;
use super::status::HighlyAvailableStatus;
use super::storage_node::{StorageNodeDataSource, StorageNodeStatus};
use super::{execute_probe, probe_first_row, DiscoveryAlgorithm, DiscoveryProps};
use crate::connection::{ResultRow, StorageConnection};
use crate::error::{Error, Result};

const TYPE: &str = "MySQL.NORMAL_REPLICATION";

/// Replica status command
pub const SHOW_SLAVE_STATUS: &str = "SHOW SLAVE STATUS";

const HOST_COLUMNS: &[&str] = &["Master_Host", "Source_Host"];
const PORT_COLUMNS: &[&str] = &["Master_Port", "Source_Port"];
const IO_RUNNING_COLUMNS: &[&str] = &["Slave_IO_Running", "Replica_IO_Running"];
const SQL_RUNNING_COLUMNS: &[&str] = &["Slave_SQL_Running", "Replica_SQL_Running"];
const DELAY_COLUMNS: &[&str] = &["Seconds_Behind_Master", "Seconds_Behind_Source"];

/// HA status parsed from one replica status row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalReplicationStatus {
    /// Primary this node replicates from
    pub primary: PrimaryDatabaseInstance,
    /// Receiver thread state; `None` when the server does not report it
    pub io_running: Option<bool>,
    /// Applier thread state; `None` when the server does not report it
    pub sql_running: Option<bool>,
    /// Replication delay; `None` while the applier is stopped
    pub seconds_behind_primary: Option<u64>,
}

impl HighlyAvailableStatus for NormalReplicationStatus {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Discovery for MySQL asynchronous replication
#[derive(Debug, Clone, Default)]
pub struct MySqlNormalReplication {
    max_delay_secs: Option<u64>,
}

impl MySqlNormalReplication {
    pub fn new(props: &DiscoveryProps) -> Self {
        Self {
            max_delay_secs: props.max_replication_delay_secs,
        }
    }

    fn parse_status(row: &ResultRow) -> Result<NormalReplicationStatus> {
        let seconds_behind_primary = match row.first_text(DELAY_COLUMNS) {
            Some(text) => Some(text.parse::<u64>().map_err(|_| {
                Error::malformed(TYPE, format!("replication delay is not a number: '{}'", text))
            })?),
            None => None,
        };

        Ok(NormalReplicationStatus {
            primary: PrimaryDatabaseInstance::from_row(TYPE, row, HOST_COLUMNS, PORT_COLUMNS)?,
            io_running: thread_running(row, IO_RUNNING_COLUMNS),
            sql_running: thread_running(row, SQL_RUNNING_COLUMNS),
            seconds_behind_primary,
        })
    }
}

/// "Yes" is running; "No" or "Connecting" is not
fn thread_running(row: &ResultRow, labels: &[&str]) -> Option<bool> {
    row.first_text(labels)
        .map(|state| state.eq_ignore_ascii_case("yes"))
}

#[async_trait]
impl DiscoveryAlgorithm for MySqlNormalReplication {
    async fn load_highly_available_status(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<Box<dyn HighlyAvailableStatus>> {
        let row = probe_first_row(TYPE, conn, SHOW_SLAVE_STATUS).await?;
        Ok(Box::new(Self::parse_status(&row)?))
    }

    async fn find_primary_instance(
        &self,
        data_source_name: &str,
        conn: &mut dyn StorageConnection,
    ) -> Result<Option<PrimaryDatabaseInstance>> {
        let rows = execute_probe(conn, SHOW_SLAVE_STATUS).await?;

        // No replica status: replication is unconfigured or this is the primary
        let Some(row) = rows.first() else {
            tracing::debug!(data_source_name, "No replica status, no primary to follow");
            return Ok(None);
        };

        // Receiver stopped or still connecting: the primary is unreachable from here
        if thread_running(row, IO_RUNNING_COLUMNS) == Some(false) {
            tracing::debug!(data_source_name, "Replica receiver not running, no reachable primary");
            return Ok(None);
        }

        PrimaryDatabaseInstance::from_row(TYPE, row, HOST_COLUMNS, PORT_COLUMNS).map(Some)
    }

    async fn storage_node_data_source(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<StorageNodeDataSource> {
        let rows = execute_probe(conn, SHOW_SLAVE_STATUS).await?;
        let Some(row) = rows.first() else {
            return Ok(StorageNodeDataSource::primary(StorageNodeStatus::Enabled));
        };

        let status = Self::parse_status(row)?;
        let node_status = match (status.io_running, status.sql_running) {
            (Some(true), Some(true)) => match (self.max_delay_secs, status.seconds_behind_primary) {
                (Some(max), Some(delay)) if delay > max => StorageNodeStatus::Disabled,
                _ => StorageNodeStatus::Enabled,
            },
            (Some(false), _) | (_, Some(false)) => StorageNodeStatus::Disabled,
            _ => StorageNodeStatus::Unknown,
        };

        Ok(StorageNodeDataSource::member(node_status))
    }

    fn type_name(&self) -> &str {
        TYPE
    }
}
