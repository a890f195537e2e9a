//! Datetime Module
//!
//! Reads wall-clock time from a backing database using each dialect's own
//! "current timestamp" query.

mod provider;
mod service;

pub use provider::{DatetimeProvider, DatetimeProviderRegistry, SqlDatetimeProvider};
pub use service::{parse_timestamp, DatabaseDatetimeService};
