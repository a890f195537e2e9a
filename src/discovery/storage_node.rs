//! Storage Node Classification
//!
//! Role and status of one probed node at a point in time.

use serde::{Deserialize, Serialize};

/// Role of a storage node in its replicated topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageNodeRole {
    /// Writable node
    Primary,
    /// Any other member (replica, secondary)
    Member,
}

impl std::fmt::Display for StorageNodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageNodeRole::Primary => write!(f, "PRIMARY"),
            StorageNodeRole::Member => write!(f, "MEMBER"),
        }
    }
}

/// Whether a storage node should receive traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageNodeStatus {
    Enabled,
    Disabled,
    Unknown,
}

impl std::fmt::Display for StorageNodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageNodeStatus::Enabled => write!(f, "ENABLED"),
            StorageNodeStatus::Disabled => write!(f, "DISABLED"),
            StorageNodeStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Snapshot of one node's classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageNodeDataSource {
    pub role: StorageNodeRole,
    pub status: StorageNodeStatus,
}

impl StorageNodeDataSource {
    pub fn new(role: StorageNodeRole, status: StorageNodeStatus) -> Self {
        Self { role, status }
    }

    pub fn primary(status: StorageNodeStatus) -> Self {
        Self::new(StorageNodeRole::Primary, status)
    }

    pub fn member(status: StorageNodeStatus) -> Self {
        Self::new(StorageNodeRole::Member, status)
    }

    pub fn is_enabled(&self) -> bool {
        self.status == StorageNodeStatus::Enabled
    }
}

impl std::fmt::Display for StorageNodeDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.role, self.status)
    }
}
