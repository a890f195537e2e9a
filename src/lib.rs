//! WolfProbe - Storage Node Discovery for Heterogeneous Databases
//!
//! Resolves which dialect applies to a storage node, inspects the
//! high-availability topology of replicated clusters and reads each
//! backend's wall-clock time with dialect-correct SQL.
//!
//! # Architecture
//!
//! Three read-only registries are populated once at startup and shared
//! freely between concurrent probes:
//!
//! - [`dialect::DialectRegistry`] maps names and connection URLs to
//!   dialect descriptors. Branch dialects (MariaDB, openGauss) name a
//!   trunk whose behaviour they inherit.
//! - [`discovery::DiscoveryAlgorithmRegistry`] maps `Dialect.TOPOLOGY`
//!   keys to shared discovery algorithms.
//! - [`datetime::DatetimeProviderRegistry`] maps dialects to their
//!   "current time" query.
//!
//! Callers own scheduling and connections. Every operation takes a
//! connection (or a source to acquire one from), releases what it opened
//! before returning, and reports failures as typed [`Error`]s without
//! logging them.

pub mod config;
pub mod connection;
pub mod datetime;
pub mod dialect;
pub mod discovery;
pub mod error;

pub use config::ProbeConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ProbeConfig;
    pub use crate::connection::{ConnectionSource, ResultRow, StorageConnection, Value};
    pub use crate::datetime::{DatabaseDatetimeService, DatetimeProviderRegistry};
    pub use crate::dialect::{DialectDescriptor, DialectRegistry};
    pub use crate::discovery::{
        DiscoveryAlgorithm, DiscoveryAlgorithmRegistry, HighlyAvailableStatus, PrimaryDatabaseInstance,
        StorageNodeDataSource,
    };
    pub use crate::error::{Error, Result};
}
