//! Datetime Providers
//!
//! Dialect-specific SQL for reading the server's current UTC time.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::dialect::DialectRegistry;
use crate::error::{Error, Result};

/// Supplies the "read server time" query for one dialect
pub trait DatetimeProvider: Send + Sync {
    /// Dialect this provider is registered under
    fn dialect(&self) -> &str;

    /// Query whose first column of the first row is the current time
    fn datetime_sql(&self) -> &str;
}

/// Provider defined by a fixed SQL string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDatetimeProvider {
    dialect: String,
    sql: String,
}

impl SqlDatetimeProvider {
    pub fn new(dialect: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            sql: sql.into(),
        }
    }
}

impl DatetimeProvider for SqlDatetimeProvider {
    fn dialect(&self) -> &str {
        &self.dialect
    }

    fn datetime_sql(&self) -> &str {
        &self.sql
    }
}

/// Registry of datetime providers keyed by dialect name
#[derive(Clone, Default)]
pub struct DatetimeProviderRegistry {
    providers: HashMap<String, Arc<dyn DatetimeProvider>>,
}

impl DatetimeProviderRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Providers for the built-in dialects
    ///
    /// MariaDB and openGauss have none of their own and use their trunk's.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (dialect, sql) in [
            ("MySQL", "SELECT UTC_TIMESTAMP(6)"),
            ("PostgreSQL", "SELECT CURRENT_TIMESTAMP"),
            ("SQLServer", "SELECT SYSUTCDATETIME()"),
            ("Oracle", "SELECT SYS_EXTRACT_UTC(SYSTIMESTAMP) FROM DUAL"),
            ("H2", "SELECT CURRENT_TIMESTAMP()"),
        ] {
            registry
                .providers
                .insert(dialect.to_string(), Arc::new(SqlDatetimeProvider::new(dialect, sql)));
        }
        registry
    }

    /// Shared built-in registry
    pub fn global() -> &'static DatetimeProviderRegistry {
        static GLOBAL: OnceLock<DatetimeProviderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DatetimeProviderRegistry::builtin)
    }

    /// Add or replace the provider for its dialect
    pub fn register(&mut self, provider: Arc<dyn DatetimeProvider>) {
        self.providers.insert(provider.dialect().to_string(), provider);
    }

    /// Provider for `dialect`, falling back along its trunk chain
    pub fn resolve(&self, dialects: &DialectRegistry, dialect: &str) -> Result<Arc<dyn DatetimeProvider>> {
        dialects
            .trunk_chain(dialect)?
            .into_iter()
            .find_map(|d| self.providers.get(&d.name))
            .cloned()
            .ok_or_else(|| Error::NoDatetimeProvider(dialect.to_string()))
    }
}

impl std::fmt::Debug for DatetimeProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dialects: Vec<&String> = self.providers.keys().collect();
        dialects.sort();
        f.debug_struct("DatetimeProviderRegistry")
            .field("dialects", &dialects)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin_and_trunk() {
        let providers = DatetimeProviderRegistry::global();
        let dialects = DialectRegistry::global();

        let mysql = providers.resolve(dialects, "MySQL").unwrap();
        assert_eq!(mysql.datetime_sql(), "SELECT UTC_TIMESTAMP(6)");

        let mariadb = providers.resolve(dialects, "MariaDB").unwrap();
        assert_eq!(mariadb.dialect(), "MySQL");

        let gauss = providers.resolve(dialects, "openGauss").unwrap();
        assert_eq!(gauss.datetime_sql(), "SELECT CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_branch_override() {
        let mut providers = DatetimeProviderRegistry::builtin();
        providers.register(Arc::new(SqlDatetimeProvider::new("MariaDB", "SELECT UTC_TIMESTAMP(3)")));

        let mariadb = providers.resolve(DialectRegistry::global(), "MariaDB").unwrap();
        assert_eq!(mariadb.datetime_sql(), "SELECT UTC_TIMESTAMP(3)");
    }

    #[test]
    fn test_resolution_failures() {
        let dialects = DialectRegistry::global();
        assert!(matches!(
            DatetimeProviderRegistry::empty().resolve(dialects, "MySQL"),
            Err(Error::NoDatetimeProvider(_))
        ));
        assert!(matches!(
            DatetimeProviderRegistry::global().resolve(dialects, "DB2"),
            Err(Error::UnknownDialect(_))
        ));
    }
}
