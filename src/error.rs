//! WolfProbe Error Types

use thiserror::Error;

/// Result type alias for WolfProbe operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfProbe error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Dialect registry errors
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("No dialect recognizes URL: {0}")]
    UnrecognizedUrl(String),

    #[error("Dialect registered twice: {0}")]
    DuplicateDialect(String),

    #[error("Dialect {dialect} names unknown trunk {trunk}")]
    UnknownTrunk { dialect: String, trunk: String },

    #[error("Cyclic trunk chain starting at dialect {0}")]
    CyclicTrunk(String),

    // Discovery algorithm errors
    #[error("Unknown discovery algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Discovery algorithm registered twice: {0}")]
    DuplicateAlgorithm(String),

    #[error("Probe failed executing '{sql}': {source}")]
    ProbeExecution {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No topology data from {algorithm}: '{sql}' returned no rows")]
    NoTopologyData { algorithm: String, sql: String },

    #[error("Malformed topology data from {algorithm}: {reason}")]
    MalformedTopologyData { algorithm: String, reason: String },

    // Datetime service errors
    #[error("No datetime provider for dialect {0}")]
    NoDatetimeProvider(String),

    #[error("Datetime loading failed: {0}")]
    DatetimeLoading(#[source] DatetimeLoadingCause),

    // Live connection setup (CLI only)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Underlying cause of a failed datetime load
#[derive(Error, Debug)]
pub enum DatetimeLoadingCause {
    #[error("could not acquire connection: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("query '{sql}' failed: {source}")]
    Query {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query '{0}' returned no rows")]
    NoRows(String),

    #[error("column 1 is not a timestamp: {0}")]
    Unparsable(String),
}

impl Error {
    /// Check if this error is worth probing again later
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ProbeExecution { .. } | Error::Database(_) => true,
            Error::DatetimeLoading(cause) => matches!(
                cause,
                DatetimeLoadingCause::Connect(_) | DatetimeLoadingCause::Query { .. }
            ),
            _ => false,
        }
    }

    /// Check if this error usually means the node is not replicated at all
    pub fn is_standalone_signal(&self) -> bool {
        matches!(self, Error::NoTopologyData { .. })
    }

    pub(crate) fn malformed(algorithm: &str, reason: impl Into<String>) -> Self {
        Error::MalformedTopologyData {
            algorithm: algorithm.to_string(),
            reason: reason.into(),
        }
    }
}
