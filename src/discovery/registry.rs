//! Discovery Algorithm Registry
//!
//! Maps type keys such as `MySQL.NORMAL_REPLICATION` to one shared
//! algorithm instance. Populated before it is shared and never mutated
//! afterwards.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::fixture::FixtureDiscoveryAlgorithm;
use super::mysql_group::MySqlGroupReplication;
use super::mysql_replication::MySqlNormalReplication;
use super::postgres_streaming::PostgresStreamingReplication;
use super::{DiscoveryAlgorithm, DiscoveryProps};
use crate::dialect::DialectRegistry;
use crate::error::{Error, Result};

/// Registry of discovery algorithms keyed by type
#[derive(Clone, Default)]
pub struct DiscoveryAlgorithmRegistry {
    algorithms: HashMap<String, Arc<dyn DiscoveryAlgorithm>>,
}

impl DiscoveryAlgorithmRegistry {
    /// Registry with no algorithms
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in algorithm
    pub fn builtin(props: &DiscoveryProps) -> Self {
        let builtin: [Arc<dyn DiscoveryAlgorithm>; 4] = [
            Arc::new(MySqlNormalReplication::new(props)),
            Arc::new(MySqlGroupReplication::new()),
            Arc::new(PostgresStreamingReplication::new()),
            Arc::new(FixtureDiscoveryAlgorithm),
        ];

        let algorithms = builtin
            .into_iter()
            .map(|a| (a.type_name().to_string(), a))
            .collect();
        Self { algorithms }
    }

    /// Shared built-in registry with default properties
    pub fn global() -> &'static DiscoveryAlgorithmRegistry {
        static GLOBAL: OnceLock<DiscoveryAlgorithmRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| DiscoveryAlgorithmRegistry::builtin(&DiscoveryProps::default()))
    }

    /// Add an algorithm under its own type key
    pub fn register(&mut self, algorithm: Arc<dyn DiscoveryAlgorithm>) -> Result<()> {
        let key = algorithm.type_name().to_string();
        if self.algorithms.contains_key(&key) {
            return Err(Error::DuplicateAlgorithm(key));
        }
        self.algorithms.insert(key, algorithm);
        Ok(())
    }

    /// Algorithm registered under exactly `type_name`
    pub fn get(&self, type_name: &str) -> Result<Arc<dyn DiscoveryAlgorithm>> {
        self.algorithms
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::UnknownAlgorithm(type_name.to_string()))
    }

    /// Algorithm for `topology` on `dialect`, falling back along the trunk chain
    ///
    /// `MariaDB` + `NORMAL_REPLICATION` finds `MySQL.NORMAL_REPLICATION`
    /// unless a MariaDB-specific algorithm is registered.
    pub fn resolve(
        &self,
        dialects: &DialectRegistry,
        dialect: &str,
        topology: &str,
    ) -> Result<Arc<dyn DiscoveryAlgorithm>> {
        for descriptor in dialects.trunk_chain(dialect)? {
            let key = format!("{}.{}", descriptor.name, topology);
            if let Some(algorithm) = self.algorithms.get(&key) {
                if descriptor.name != dialect {
                    tracing::trace!(dialect, algorithm = %key, "Using trunk discovery algorithm");
                }
                return Ok(Arc::clone(algorithm));
            }
        }

        Err(Error::UnknownAlgorithm(format!("{}.{}", dialect, topology)))
    }

    /// Registered type keys, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.algorithms.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for DiscoveryAlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryAlgorithmRegistry")
            .field("types", &self.types())
            .finish()
    }
}
