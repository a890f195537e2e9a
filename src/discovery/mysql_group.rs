//! MySQL Group Replication
//!
//! Discovery for MGR clusters through `performance_schema`. In
//! multi-primary mode there is no single primary, so
//! `find_primary_instance` returns `None` there.

use std::any::Any;

use async_trait::async_trait;
use serde::Serialize;

use super::instance::PrimaryDatabaseInstance;
use super::status::HighlyAvailableStatus;
use super::storage_node::{StorageNodeDataSource, StorageNodeRole, StorageNodeStatus};
use super::{execute_probe, parse_flag, probe_first_row, DiscoveryAlgorithm};
use crate::connection::StorageConnection;
use crate::error::{Error, Result};

const TYPE: &str = "MySQL.MGR";

const QUERY_PLUGIN_STATUS: &str =
    "SELECT PLUGIN_STATUS FROM information_schema.PLUGINS WHERE PLUGIN_NAME = 'group_replication'";

const QUERY_GROUP_STATE: &str = "SELECT @@group_replication_group_name AS group_name, \
     @@group_replication_single_primary_mode AS single_primary_mode, \
     (SELECT COUNT(*) FROM performance_schema.replication_group_members WHERE MEMBER_STATE = 'ONLINE') AS online_members";

const QUERY_PRIMARY_MEMBER: &str = "SELECT MEMBER_HOST, MEMBER_PORT FROM performance_schema.replication_group_members \
     WHERE MEMBER_ID = (SELECT VARIABLE_VALUE FROM performance_schema.global_status \
     WHERE VARIABLE_NAME = 'group_replication_primary_member')";

const QUERY_LOCAL_MEMBER: &str = "SELECT MEMBER_ROLE, MEMBER_STATE FROM performance_schema.replication_group_members \
     WHERE MEMBER_ID = @@server_uuid";

/// HA status of a group replication member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReplicationStatus {
    /// Whether the group_replication plugin is ACTIVE
    pub plugin_active: bool,
    pub group_name: Option<String>,
    pub single_primary_mode: Option<bool>,
    /// Members currently ONLINE, as seen from this node
    pub online_members: u64,
}

impl HighlyAvailableStatus for GroupReplicationStatus {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Discovery for MySQL group replication
#[derive(Debug, Clone, Default)]
pub struct MySqlGroupReplication;

impl MySqlGroupReplication {
    pub fn new() -> Self {
        Self
    }
}

fn member_status(state: &str) -> StorageNodeStatus {
    match state.to_ascii_uppercase().as_str() {
        "ONLINE" => StorageNodeStatus::Enabled,
        "RECOVERING" | "OFFLINE" | "ERROR" | "UNREACHABLE" => StorageNodeStatus::Disabled,
        _ => StorageNodeStatus::Unknown,
    }
}

#[async_trait]
impl DiscoveryAlgorithm for MySqlGroupReplication {
    async fn load_highly_available_status(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<Box<dyn HighlyAvailableStatus>> {
        // No plugin row: group replication is not installed here
        let plugin = probe_first_row(TYPE, conn, QUERY_PLUGIN_STATUS).await?;
        let plugin_active = plugin
            .text("PLUGIN_STATUS")
            .map(|s| s.eq_ignore_ascii_case("ACTIVE"))
            .unwrap_or(false);

        if !plugin_active {
            return Ok(Box::new(GroupReplicationStatus {
                plugin_active,
                group_name: None,
                single_primary_mode: None,
                online_members: 0,
            }));
        }

        let row = probe_first_row(TYPE, conn, QUERY_GROUP_STATE).await?;
        let online_members = match row.text("online_members") {
            Some(count) => count.parse::<u64>().map_err(|_| {
                Error::malformed(TYPE, format!("online member count is not a number: '{}'", count))
            })?,
            None => 0,
        };

        Ok(Box::new(GroupReplicationStatus {
            plugin_active,
            group_name: row.text("group_name"),
            single_primary_mode: Some(parse_flag(TYPE, &row, "single_primary_mode")?),
            online_members,
        }))
    }

    async fn find_primary_instance(
        &self,
        data_source_name: &str,
        conn: &mut dyn StorageConnection,
    ) -> Result<Option<PrimaryDatabaseInstance>> {
        let rows = execute_probe(conn, QUERY_PRIMARY_MEMBER).await?;
        let Some(row) = rows.first() else {
            tracing::debug!(data_source_name, "Group reports no single primary");
            return Ok(None);
        };

        PrimaryDatabaseInstance::from_row(TYPE, row, &["MEMBER_HOST"], &["MEMBER_PORT"]).map(Some)
    }

    async fn storage_node_data_source(
        &self,
        conn: &mut dyn StorageConnection,
    ) -> Result<StorageNodeDataSource> {
        let row = probe_first_row(TYPE, conn, QUERY_LOCAL_MEMBER).await?;

        let role = match row.text("MEMBER_ROLE") {
            Some(role) if role.eq_ignore_ascii_case("PRIMARY") => StorageNodeRole::Primary,
            _ => StorageNodeRole::Member,
        };
        let status = row
            .text("MEMBER_STATE")
            .map(|state| member_status(&state))
            .unwrap_or(StorageNodeStatus::Unknown);

        Ok(StorageNodeDataSource::new(role, status))
    }

    fn type_name(&self) -> &str {
        TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{MemoryConnection, ResultRow};

    fn group_member() -> MemoryConnection {
        MemoryConnection::new("jdbc:mysql://mgr-2:3306/app")
            .with_result(
                QUERY_PLUGIN_STATUS,
                vec![ResultRow::new().with("PLUGIN_STATUS", "ACTIVE")],
            )
            .with_result(
                QUERY_GROUP_STATE,
                vec![ResultRow::new()
                    .with("group_name", "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee")
                    .with("single_primary_mode", 1i64)
                    .with("online_members", 3i64)],
            )
            .with_result(
                QUERY_PRIMARY_MEMBER,
                vec![ResultRow::new()
                    .with("MEMBER_HOST", "mgr-1")
                    .with("MEMBER_PORT", 3306u64)],
            )
            .with_result(
                QUERY_LOCAL_MEMBER,
                vec![ResultRow::new()
                    .with("MEMBER_ROLE", "SECONDARY")
                    .with("MEMBER_STATE", "ONLINE")],
            )
    }

    #[tokio::test]
    async fn test_group_status() {
        let mut conn = group_member();
        let status = MySqlGroupReplication::new()
            .load_highly_available_status(&mut conn)
            .await
            .unwrap();

        let status = status.downcast_ref::<GroupReplicationStatus>().unwrap();
        assert!(status.plugin_active);
        assert_eq!(status.single_primary_mode, Some(true));
        assert_eq!(status.online_members, 3);
        assert_eq!(status.to_json()["online_members"], 3);
    }

    #[tokio::test]
    async fn test_inactive_plugin_skips_group_query() {
        let mut conn = MemoryConnection::new("jdbc:mysql://db/app").with_result(
            QUERY_PLUGIN_STATUS,
            vec![ResultRow::new().with("PLUGIN_STATUS", "DISABLED")],
        );

        let status = MySqlGroupReplication::new()
            .load_highly_available_status(&mut conn)
            .await
            .unwrap();
        let status = status.downcast_ref::<GroupReplicationStatus>().unwrap();
        assert!(!status.plugin_active);
        assert_eq!(conn.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_plugin_is_no_topology() {
        let mut conn = MemoryConnection::new("jdbc:mysql://db/app").with_result(QUERY_PLUGIN_STATUS, vec![]);
        let err = MySqlGroupReplication::new()
            .load_highly_available_status(&mut conn)
            .await
            .unwrap_err();
        assert!(err.is_standalone_signal());
    }

    #[tokio::test]
    async fn test_find_primary_and_classify() {
        let algorithm = MySqlGroupReplication::new();
        let mut conn = group_member();

        let primary = algorithm.find_primary_instance("ds_1", &mut conn).await.unwrap();
        assert_eq!(primary, Some(PrimaryDatabaseInstance::address("mgr-1", 3306)));

        let node = algorithm.storage_node_data_source(&mut conn).await.unwrap();
        assert_eq!(node, StorageNodeDataSource::member(StorageNodeStatus::Enabled));
    }

    #[tokio::test]
    async fn test_multi_primary_has_no_primary() {
        let mut conn = MemoryConnection::new("jdbc:mysql://db/app").with_result(QUERY_PRIMARY_MEMBER, vec![]);
        let primary = MySqlGroupReplication::new()
            .find_primary_instance("ds_1", &mut conn)
            .await
            .unwrap();
        assert!(primary.is_none());
    }

    #[tokio::test]
    async fn test_member_states() {
        assert_eq!(member_status("ONLINE"), StorageNodeStatus::Enabled);
        assert_eq!(member_status("recovering"), StorageNodeStatus::Disabled);
        assert_eq!(member_status("UNREACHABLE"), StorageNodeStatus::Disabled);
        assert_eq!(member_status("JOINING"), StorageNodeStatus::Unknown);

        let mut conn = MemoryConnection::new("jdbc:mysql://db/app").with_result(
            QUERY_LOCAL_MEMBER,
            vec![ResultRow::new()
                .with("MEMBER_ROLE", "PRIMARY")
                .with("MEMBER_STATE", "ERROR")],
        );
        let node = MySqlGroupReplication::new()
            .storage_node_data_source(&mut conn)
            .await
            .unwrap();
        assert_eq!(node, StorageNodeDataSource::primary(StorageNodeStatus::Disabled));
    }
}
