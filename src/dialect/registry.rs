//! Dialect Registry
//!
//! Process-wide lookup from dialect name, or from a connection URL, to its
//! descriptor. Built once at startup and read-only afterwards, so lookups
//! need no locking.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::descriptor::{DialectDescriptor, QuoteCharacter};
use crate::error::{Error, Result};

/// Registry of dialect descriptors
#[derive(Debug, Clone)]
pub struct DialectRegistry {
    /// Descriptors in registration order
    descriptors: Vec<DialectDescriptor>,
    /// Name to index into `descriptors`
    by_name: HashMap<String, usize>,
}

impl DialectRegistry {
    /// Build a registry, validating names and trunk references
    ///
    /// Fails on duplicate names, trunks naming unknown dialects and
    /// cyclic trunk chains.
    pub fn new(descriptors: Vec<DialectDescriptor>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            if by_name.insert(descriptor.name.clone(), index).is_some() {
                return Err(Error::DuplicateDialect(descriptor.name.clone()));
            }
        }

        let registry = Self { descriptors, by_name };
        registry.validate_trunks()?;
        Ok(registry)
    }

    /// The built-in dialect table
    pub fn builtin() -> Self {
        // The static table is known to be valid; construct without re-checking
        let descriptors = builtin_descriptors();
        let by_name = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { descriptors, by_name }
    }

    /// Built-in table followed by `extra` descriptors
    pub fn with_extra(extra: Vec<DialectDescriptor>) -> Result<Self> {
        let mut descriptors = builtin_descriptors();
        descriptors.extend(extra);
        Self::new(descriptors)
    }

    /// Shared built-in registry
    pub fn global() -> &'static DialectRegistry {
        static GLOBAL: OnceLock<DialectRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DialectRegistry::builtin)
    }

    /// Descriptor registered under exactly `name`
    pub fn resolve(&self, name: &str) -> Result<&DialectDescriptor> {
        self.by_name
            .get(name)
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| Error::UnknownDialect(name.to_string()))
    }

    /// First descriptor, in registration order, claiming a prefix of `url`
    pub fn resolve_from_url(&self, url: &str) -> Result<&DialectDescriptor> {
        let descriptor = self
            .descriptors
            .iter()
            .find(|d| d.matches_url(url))
            .ok_or_else(|| Error::UnrecognizedUrl(url.to_string()))?;

        tracing::trace!(dialect = %descriptor.name, "Resolved dialect from URL");
        Ok(descriptor)
    }

    /// Follow the trunk chain of `name` to a descriptor with no trunk
    pub fn resolve_trunk(&self, name: &str) -> Result<&DialectDescriptor> {
        self.trunk_chain(name)?
            .last()
            .copied()
            .ok_or_else(|| Error::UnknownDialect(name.to_string()))
    }

    /// `name` followed by each trunk up to the root
    pub fn trunk_chain(&self, name: &str) -> Result<Vec<&DialectDescriptor>> {
        let mut current = self.resolve(name)?;
        let mut chain = vec![current];

        while let Some(trunk) = &current.trunk {
            // A chain longer than the registry must revisit a node
            if chain.len() > self.descriptors.len() {
                return Err(Error::CyclicTrunk(name.to_string()));
            }
            current = self.resolve(trunk)?;
            chain.push(current);
        }

        Ok(chain)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    /// Registered descriptors, in registration order
    pub fn descriptors(&self) -> &[DialectDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    fn validate_trunks(&self) -> Result<()> {
        for descriptor in &self.descriptors {
            if let Some(trunk) = &descriptor.trunk {
                if !self.by_name.contains_key(trunk) {
                    return Err(Error::UnknownTrunk {
                        dialect: descriptor.name.clone(),
                        trunk: trunk.clone(),
                    });
                }
            }
        }
        for descriptor in &self.descriptors {
            self.trunk_chain(&descriptor.name)?;
        }
        Ok(())
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_descriptors() -> Vec<DialectDescriptor> {
    vec![
        DialectDescriptor::new("MySQL", QuoteCharacter::BackQuote)
            .with_url_prefixes(["jdbc:mysql:", "jdbc:mysqlx:", "mysql:", "mysqlx:"])
            .with_driver("mysql")
            .with_default_port(3306)
            .with_system_schemas(["information_schema", "performance_schema", "mysql", "sys"]),
        DialectDescriptor::new("MariaDB", QuoteCharacter::BackQuote)
            .with_url_prefixes(["jdbc:mariadb:", "mariadb:"])
            .with_driver("mysql")
            .with_default_port(3306)
            .with_trunk("MySQL"),
        DialectDescriptor::new("PostgreSQL", QuoteCharacter::Quote)
            .with_url_prefixes(["jdbc:postgresql:", "postgresql:", "postgres:"])
            .with_default_port(5432)
            .with_system_schemas(["information_schema", "pg_catalog"]),
        DialectDescriptor::new("openGauss", QuoteCharacter::Quote)
            .with_url_prefixes(["jdbc:opengauss:", "opengauss:"])
            .with_default_port(5432)
            .with_system_schemas(["information_schema", "pg_catalog", "blockchain", "cstore", "db4ai", "dbe_perf", "snapshot"])
            .with_trunk("PostgreSQL"),
        DialectDescriptor::new("SQLServer", QuoteCharacter::Brackets)
            .with_url_prefixes(["jdbc:microsoft:sqlserver:", "jdbc:sqlserver:", "sqlserver:", "mssql:"])
            .with_default_port(1433),
        DialectDescriptor::new("Oracle", QuoteCharacter::Quote)
            .with_url_prefixes(["jdbc:oracle:", "oracle:"])
            .with_default_port(1521),
        DialectDescriptor::new("H2", QuoteCharacter::Quote)
            .with_url_prefixes(["jdbc:h2:", "h2:"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(name: &str, prefixes: &[&str], trunk: Option<&str>) -> DialectDescriptor {
        let descriptor = DialectDescriptor::new(name, QuoteCharacter::Quote)
            .with_url_prefixes(prefixes.iter().copied());
        match trunk {
            Some(t) => descriptor.with_trunk(t),
            None => descriptor,
        }
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let builtin = DialectRegistry::builtin();
        let validated = DialectRegistry::new(builtin.descriptors().to_vec()).unwrap();
        assert_eq!(validated.len(), builtin.len());
        assert_eq!(
            builtin.names().collect::<Vec<_>>(),
            vec!["MySQL", "MariaDB", "PostgreSQL", "openGauss", "SQLServer", "Oracle", "H2"]
        );
    }

    #[test]
    fn test_resolve_by_name() {
        let registry = DialectRegistry::global();
        let mysql = registry.resolve("MySQL").unwrap();
        assert_eq!(mysql.quote, QuoteCharacter::BackQuote);
        assert_eq!(mysql.driver.as_deref(), Some("mysql"));
        assert!(mysql.is_system_schema("performance_schema"));

        assert!(registry.resolve("MariaDB").unwrap().system_schemas.is_empty());
        assert!(matches!(registry.resolve("mysql"), Err(Error::UnknownDialect(_))));
        assert!(matches!(registry.resolve("DB2"), Err(Error::UnknownDialect(_))));
    }

    #[test]
    fn test_resolve_from_url() {
        let registry = DialectRegistry::global();
        let cases = [
            ("jdbc:mysql://127.0.0.1:3306/foo_ds", "MySQL"),
            ("mysqlx://db/app", "MySQL"),
            ("jdbc:mariadb://db:3306/app", "MariaDB"),
            ("postgres://db/app", "PostgreSQL"),
            ("jdbc:opengauss://db:5432/app", "openGauss"),
            ("jdbc:sqlserver://db;DatabaseName=app", "SQLServer"),
            ("jdbc:oracle:thin:@db:1521:orcl", "Oracle"),
            ("jdbc:h2:mem:test", "H2"),
        ];
        for (url, expected) in cases {
            assert_eq!(registry.resolve_from_url(url).unwrap().name, expected, "{}", url);
        }

        assert!(matches!(
            registry.resolve_from_url("jdbc:db2://db:50000/app"),
            Err(Error::UnrecognizedUrl(_))
        ));
    }

    #[test]
    fn test_resolve_from_url_is_first_match() {
        let registry = DialectRegistry::new(vec![
            custom("Foo", &["jdbc:foo:"], None),
            custom("FooBar", &["jdbc:foo:bar:"], None),
        ])
        .unwrap();

        for _ in 0..10 {
            assert_eq!(registry.resolve_from_url("jdbc:foo:bar://db").unwrap().name, "Foo");
        }

        let reversed = DialectRegistry::new(vec![
            custom("FooBar", &["jdbc:foo:bar:"], None),
            custom("Foo", &["jdbc:foo:"], None),
        ])
        .unwrap();
        assert_eq!(reversed.resolve_from_url("jdbc:foo:bar://db").unwrap().name, "FooBar");
        assert_eq!(reversed.resolve_from_url("jdbc:foo://db").unwrap().name, "Foo");
    }

    #[test]
    fn test_resolve_trunk() {
        let registry = DialectRegistry::global();
        assert_eq!(registry.resolve_trunk("MariaDB").unwrap().name, "MySQL");
        assert_eq!(registry.resolve_trunk("openGauss").unwrap().name, "PostgreSQL");
        assert_eq!(registry.resolve_trunk("MySQL").unwrap().name, "MySQL");
        assert!(registry.resolve_trunk("Nope").is_err());
    }

    #[test]
    fn test_trunk_chain_terminates() {
        let n = 8;
        let descriptors = (0..n)
            .map(|i| {
                let trunk = (i > 0).then(|| format!("D{}", i - 1));
                custom(&format!("D{}", i), &[], trunk.as_deref())
            })
            .collect();
        let registry = DialectRegistry::new(descriptors).unwrap();

        let chain = registry.trunk_chain(&format!("D{}", n - 1)).unwrap();
        assert_eq!(chain.len(), n);
        let root = registry.resolve_trunk(&format!("D{}", n - 1)).unwrap();
        assert_eq!(root.name, "D0");
        assert!(root.trunk.is_none());
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let duplicate = DialectRegistry::new(vec![custom("A", &[], None), custom("A", &[], None)]);
        assert!(matches!(duplicate, Err(Error::DuplicateDialect(_))));

        let dangling = DialectRegistry::new(vec![custom("A", &[], Some("Z"))]);
        assert!(matches!(dangling, Err(Error::UnknownTrunk { .. })));

        let cyclic = DialectRegistry::new(vec![
            custom("A", &[], Some("B")),
            custom("B", &[], Some("C")),
            custom("C", &[], Some("A")),
        ]);
        assert!(matches!(cyclic, Err(Error::CyclicTrunk(_))));

        let self_loop = DialectRegistry::new(vec![custom("A", &[], Some("A"))]);
        assert!(matches!(self_loop, Err(Error::CyclicTrunk(_))));
    }

    #[test]
    fn test_with_extra_appends_after_builtin() {
        let registry = DialectRegistry::with_extra(vec![custom("TiDB", &["jdbc:tidb:"], Some("MySQL"))]).unwrap();
        assert_eq!(registry.names().last(), Some("TiDB"));
        assert_eq!(registry.resolve_trunk("TiDB").unwrap().name, "MySQL");
        // Built-in prefixes still win for shared URLs
        assert_eq!(registry.resolve_from_url("jdbc:mysql://db").unwrap().name, "MySQL");
    }
}
