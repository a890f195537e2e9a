//! Fixture Discovery
//!
//! Answers every probe with fixed values and never touches the
//! connection. Lets monitor loops be exercised end to end without a
//! replicated backend.

use std::any::Any;

use async_trait::async_trait;
use serde::Serialize;

use super::instance::PrimaryDatabaseInstance;
use super::status::HighlyAvailableStatus;
use super::storage_node::{StorageNodeDataSource, StorageNodeStatus};
use super::DiscoveryAlgorithm;
use crate::connection::StorageConnection;
use crate::error::Result;

const TYPE: &str = "CORE.FIXTURE";

/// Data source name reported as primary
pub const FIXTURE_PRIMARY: &str = "primary";

/// Status reported by the fixture algorithm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixtureStatus;

impl HighlyAvailableStatus for FixtureStatus {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "fixture": true })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixtureDiscoveryAlgorithm;

#[async_trait]
impl DiscoveryAlgorithm for FixtureDiscoveryAlgorithm {
    async fn load_highly_available_status(
        &self,
        _conn: &mut dyn StorageConnection,
    ) -> Result<Box<dyn HighlyAvailableStatus>> {
        Ok(Box::new(FixtureStatus))
    }

    async fn find_primary_instance(
        &self,
        _data_source_name: &str,
        _conn: &mut dyn StorageConnection,
    ) -> Result<Option<PrimaryDatabaseInstance>> {
        Ok(Some(PrimaryDatabaseInstance::named(FIXTURE_PRIMARY)))
    }

    async fn storage_node_data_source(
        &self,
        _conn: &mut dyn StorageConnection,
    ) -> Result<StorageNodeDataSource> {
        Ok(StorageNodeDataSource::member(StorageNodeStatus::Enabled))
    }

    fn type_name(&self) -> &str {
        TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryConnection;

    #[tokio::test]
    async fn test_fixture_never_queries() {
        let algorithm = FixtureDiscoveryAlgorithm;
        let mut conn = MemoryConnection::new("jdbc:h2:mem:fixture").with_fault("unused");

        assert!(algorithm
            .load_highly_available_status(&mut conn)
            .await
            .unwrap()
            .downcast_ref::<FixtureStatus>()
            .is_some());
        assert_eq!(
            algorithm.find_primary_instance("ds_0", &mut conn).await.unwrap(),
            Some(PrimaryDatabaseInstance::named("primary"))
        );
        assert_eq!(
            algorithm.storage_node_data_source(&mut conn).await.unwrap(),
            StorageNodeDataSource::member(StorageNodeStatus::Enabled)
        );
        assert!(conn.executed().is_empty());
    }
}
