//! Primary Database Instance
//!
//! Identity of the node a probe reports as primary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::ResultRow;
use crate::error::{Error, Result};

/// Who the primary is, either by logical data source name or by address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimaryDatabaseInstance {
    /// Primary known by its logical data source name
    Named { data_source_name: String },
    /// Primary known by network address
    Address { host: String, port: u16 },
}

impl PrimaryDatabaseInstance {
    pub fn named(data_source_name: impl Into<String>) -> Self {
        PrimaryDatabaseInstance::Named {
            data_source_name: data_source_name.into(),
        }
    }

    pub fn address(host: impl Into<String>, port: u16) -> Self {
        PrimaryDatabaseInstance::Address {
            host: host.into(),
            port,
        }
    }

    /// Build an address identity from raw host and port text
    ///
    /// Both parts must be present; the port must be a non-zero `u16`.
    /// Returns the reason on failure.
    pub fn parse_address(host: Option<&str>, port: Option<&str>) -> std::result::Result<Self, String> {
        let host = host.map(str::trim).filter(|h| !h.is_empty());
        let port = port.map(str::trim).filter(|p| !p.is_empty());

        match (host, port) {
            (Some(host), Some(port)) => match port.parse::<u16>() {
                Ok(p) if p > 0 => Ok(Self::address(host, p)),
                _ => Err(format!("primary {} has invalid port '{}'", host, port)),
            },
            (Some(host), None) => Err(format!("primary {} has no port", host)),
            (None, Some(port)) => Err(format!("primary on port {} has no host", port)),
            (None, None) => Err("primary host and port are both missing".to_string()),
        }
    }

    /// Read an address identity out of a topology row
    ///
    /// Each label list is tried in order; the first non-blank column wins.
    pub(crate) fn from_row(
        algorithm: &str,
        row: &ResultRow,
        host_labels: &[&str],
        port_labels: &[&str],
    ) -> Result<Self> {
        let host = row.first_text(host_labels);
        let port = row.first_text(port_labels);
        Self::parse_address(host.as_deref(), port.as_deref())
            .map_err(|reason| Error::malformed(algorithm, reason))
    }

    /// Logical name of a named instance
    pub fn data_source_name(&self) -> Option<&str> {
        match self {
            PrimaryDatabaseInstance::Named { data_source_name } => Some(data_source_name),
            PrimaryDatabaseInstance::Address { .. } => None,
        }
    }

    /// Host and port of an address instance
    pub fn host_port(&self) -> Option<(&str, u16)> {
        match self {
            PrimaryDatabaseInstance::Address { host, port } => Some((host, *port)),
            PrimaryDatabaseInstance::Named { .. } => None,
        }
    }
}

impl fmt::Display for PrimaryDatabaseInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryDatabaseInstance::Named { data_source_name } => write!(f, "{}", data_source_name),
            PrimaryDatabaseInstance::Address { host, port } if host.contains(':') => {
                write!(f, "[{}]:{}", host, port)
            }
            PrimaryDatabaseInstance::Address { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}
