//! WolfProbe Configuration
//!
//! This module provides configuration structures for the probe CLI: which
//! storage nodes to inspect, which clock source to read, and the extra
//! dialects and algorithm properties applied at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::datetime::DatetimeProviderRegistry;
use crate::dialect::{DialectDescriptor, DialectRegistry};
use crate::discovery::{DiscoveryAlgorithmRegistry, DiscoveryProps};

/// Main WolfProbe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Connection timeout in seconds for live connections
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum pooled connections per storage node
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Storage whose clock the datetime service reads
    #[serde(default)]
    pub datetime: Option<DatetimeConfig>,

    /// Storage nodes probed for topology
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Discovery algorithm properties
    #[serde(default)]
    pub discovery: DiscoveryProps,

    /// Dialects registered after the built-in ones
    #[serde(default)]
    pub dialects: Vec<DialectDescriptor>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Datetime source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatetimeConfig {
    /// Dialect name; recognized from the URL when absent
    #[serde(default, rename = "type")]
    pub storage_type: Option<String>,

    /// Connection URL
    pub url: String,
}

/// One probed storage node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Logical data source name
    pub data_source_name: String,

    /// Connection URL
    pub url: String,

    /// Dialect name; recognized from the URL when absent
    #[serde(default, rename = "type")]
    pub storage_type: Option<String>,

    /// Topology suffix of the discovery algorithm, e.g. "MGR"
    #[serde(default = "default_topology")]
    pub topology: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_connect_timeout() -> u64 {
    5
}

fn default_pool_size() -> u32 {
    2
}

fn default_topology() -> String {
    "NORMAL_REPLICATION".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            pool_size: default_pool_size(),
            datetime: None,
            nodes: Vec::new(),
            discovery: DiscoveryProps::default(),
            dialects: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Dialect of this node, by explicit type or by URL
    pub fn dialect<'a>(&self, registry: &'a DialectRegistry) -> crate::Result<&'a DialectDescriptor> {
        resolve_dialect(registry, self.storage_type.as_deref(), &self.url)
    }
}

impl DatetimeConfig {
    /// Dialect of the clock source, by explicit type or by URL
    pub fn dialect<'a>(&self, registry: &'a DialectRegistry) -> crate::Result<&'a DialectDescriptor> {
        resolve_dialect(registry, self.storage_type.as_deref(), &self.url)
    }
}

fn resolve_dialect<'a>(
    registry: &'a DialectRegistry,
    storage_type: Option<&str>,
    url: &str,
) -> crate::Result<&'a DialectDescriptor> {
    match storage_type {
        Some(name) => registry.resolve(name),
        None => registry.resolve_from_url(url),
    }
}

impl ProbeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ProbeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: ProbeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Every node must resolve to a dialect and a discovery algorithm, so
    /// a config that validates never fails lookup at probe time.
    pub fn validate(&self) -> crate::Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(crate::Error::Config("connect_timeout_secs must be positive".into()));
        }

        if self.pool_size == 0 {
            return Err(crate::Error::Config("pool_size must be positive".into()));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::Error::Config(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }

        let dialects = self.dialect_registry()?;
        let algorithms = self.algorithm_registry();

        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.data_source_name.is_empty() {
                return Err(crate::Error::Config("nodes.data_source_name cannot be empty".into()));
            }
            if !names.insert(node.data_source_name.as_str()) {
                return Err(crate::Error::Config(format!(
                    "duplicate node data_source_name '{}'",
                    node.data_source_name
                )));
            }
            if node.url.is_empty() {
                return Err(crate::Error::Config(format!(
                    "nodes.url cannot be empty for '{}'",
                    node.data_source_name
                )));
            }

            let dialect = node.dialect(&dialects)?;
            algorithms.resolve(&dialects, &dialect.name, &node.topology)?;
        }

        if let Some(datetime) = &self.datetime {
            if datetime.url.is_empty() {
                return Err(crate::Error::Config("datetime.url cannot be empty".into()));
            }
            let dialect = datetime.dialect(&dialects)?;
            self.datetime_providers().resolve(&dialects, &dialect.name)?;
        }

        Ok(())
    }

    /// Built-in dialects followed by the configured ones
    pub fn dialect_registry(&self) -> crate::Result<DialectRegistry> {
        DialectRegistry::with_extra(self.dialects.clone())
    }

    /// Built-in discovery algorithms with the configured properties
    pub fn algorithm_registry(&self) -> DiscoveryAlgorithmRegistry {
        DiscoveryAlgorithmRegistry::builtin(&self.discovery)
    }

    /// Built-in datetime providers
    pub fn datetime_providers(&self) -> DatetimeProviderRegistry {
        DatetimeProviderRegistry::builtin()
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Write;

    const SAMPLE: &str = r#"
connect_timeout_secs = 3

[datetime]
url = "jdbc:mysql://clock:3306/app"

[[nodes]]
data_source_name = "primary_ds"
url = "jdbc:mysql://db-1:3306/app"

[[nodes]]
data_source_name = "replica_ds_0"
url = "jdbc:mysql://db-2:3306/app"
type = "MariaDB"

[[nodes]]
data_source_name = "group_ds"
url = "jdbc:mysql://db-3:3306/app"
topology = "MGR"

[discovery]
max_replication_delay_secs = 30

[logging]
level = "debug"
format = "json"
"#;

    #[test]
    fn test_parse_config() {
        let config = ProbeConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.nodes.len(), 3);
        assert_eq!(config.nodes[0].topology, "NORMAL_REPLICATION");
        assert_eq!(config.nodes[2].topology, "MGR");
        assert_eq!(config.discovery.max_replication_delay_secs, Some(30));
        assert_eq!(config.logging.format, "json");

        let dialects = config.dialect_registry().unwrap();
        assert_eq!(config.nodes[0].dialect(&dialects).unwrap().name, "MySQL");
        assert_eq!(config.nodes[1].dialect(&dialects).unwrap().name, "MariaDB");
        assert_eq!(config.datetime.unwrap().dialect(&dialects).unwrap().name, "MySQL");
    }

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::from_str("").unwrap();
        assert_eq!(config.connect_timeout_secs, 5);
        assert!(config.nodes.is_empty());
        assert!(config.datetime.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_extra_dialect_with_trunk() {
        let toml = r#"
[[dialects]]
name = "TiDB"
quote = "back_quote"
url_prefixes = ["jdbc:tidb:"]
default_port = 4000
trunk = "MySQL"

[[nodes]]
data_source_name = "tidb_ds"
url = "jdbc:tidb://tidb-1/app"
"#;
        let config = ProbeConfig::from_str(toml).unwrap();
        let dialects = config.dialect_registry().unwrap();
        assert_eq!(dialects.resolve_trunk("TiDB").unwrap().name, "MySQL");
        assert_eq!(config.nodes[0].dialect(&dialects).unwrap().name, "TiDB");
    }

    #[test]
    fn test_validation_failures() {
        let duplicate = r#"
[[nodes]]
data_source_name = "ds"
url = "jdbc:mysql://a/app"

[[nodes]]
data_source_name = "ds"
url = "jdbc:mysql://b/app"
"#;
        assert!(matches!(ProbeConfig::from_str(duplicate), Err(Error::Config(_))));

        let unknown_type = r#"
[[nodes]]
data_source_name = "ds"
url = "jdbc:mysql://a/app"
type = "DB2"
"#;
        assert!(matches!(ProbeConfig::from_str(unknown_type), Err(Error::UnknownDialect(_))));

        let unrecognized = r#"
[[nodes]]
data_source_name = "ds"
url = "jdbc:db2://a/app"
"#;
        assert!(matches!(ProbeConfig::from_str(unrecognized), Err(Error::UnrecognizedUrl(_))));

        let no_algorithm = r#"
[[nodes]]
data_source_name = "ds"
url = "jdbc:oracle:thin:@ora:1521:orcl"
"#;
        assert!(matches!(ProbeConfig::from_str(no_algorithm), Err(Error::UnknownAlgorithm(_))));

        let bad_format = "[logging]\nformat = \"xml\"\n";
        assert!(matches!(ProbeConfig::from_str(bad_format), Err(Error::Config(_))));

        assert!(matches!(ProbeConfig::from_str("nodes = 3"), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ProbeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.nodes[1].data_source_name, "replica_ds_0");

        let missing = ProbeConfig::from_file(std::path::Path::new("/nonexistent/wolfprobe.toml"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
