//! Dialect Module
//!
//! Per-engine metadata (quoting, URL prefixes, drivers, system schemas,
//! trunk/branch relations) and the registry resolving names and URLs to it.

mod descriptor;
mod metadata;
mod registry;

pub use descriptor::{DialectDescriptor, QuoteCharacter};
pub use metadata::DataSourceMetaData;
pub use registry::DialectRegistry;
