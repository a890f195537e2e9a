//! Dialect Descriptors
//!
//! Static metadata describing one database engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::metadata::DataSourceMetaData;
use crate::error::Result;

/// Identifier quoting style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteCharacter {
    /// `name`
    BackQuote,
    /// "name"
    Quote,
    /// [name]
    Brackets,
    /// No quoting
    None,
}

impl QuoteCharacter {
    pub fn start(&self) -> &'static str {
        match self {
            QuoteCharacter::BackQuote => "`",
            QuoteCharacter::Quote => "\"",
            QuoteCharacter::Brackets => "[",
            QuoteCharacter::None => "",
        }
    }

    pub fn end(&self) -> &'static str {
        match self {
            QuoteCharacter::BackQuote => "`",
            QuoteCharacter::Quote => "\"",
            QuoteCharacter::Brackets => "]",
            QuoteCharacter::None => "",
        }
    }

    /// Quote an identifier
    pub fn wrap(&self, identifier: &str) -> String {
        format!("{}{}{}", self.start(), identifier, self.end())
    }

    /// Strip this style's quotes from an identifier if present
    pub fn unwrap<'a>(&self, identifier: &'a str) -> &'a str {
        if matches!(self, QuoteCharacter::None) {
            return identifier;
        }
        identifier
            .strip_prefix(self.start())
            .and_then(|s| s.strip_suffix(self.end()))
            .unwrap_or(identifier)
    }
}

/// Immutable description of a database dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectDescriptor {
    /// Unique dialect name, e.g. "MySQL"
    pub name: String,

    /// Identifier quoting
    pub quote: QuoteCharacter,

    /// URL prefixes this dialect claims, matched in order
    #[serde(default)]
    pub url_prefixes: Vec<String>,

    /// Native driver name, absent when no driver is bundled
    #[serde(default)]
    pub driver: Option<String>,

    /// Port assumed when a URL names none
    #[serde(default)]
    pub default_port: Option<u16>,

    /// System schema name to the schemas considered internal
    #[serde(default)]
    pub system_schemas: BTreeMap<String, BTreeSet<String>>,

    /// Dialect whose algorithms this one reuses
    #[serde(default)]
    pub trunk: Option<String>,
}

impl DialectDescriptor {
    /// Create a descriptor with no prefixes, driver, schemas or trunk
    pub fn new(name: impl Into<String>, quote: QuoteCharacter) -> Self {
        Self {
            name: name.into(),
            quote,
            url_prefixes: Vec::new(),
            driver: None,
            default_port: None,
            system_schemas: BTreeMap::new(),
            trunk: None,
        }
    }

    pub fn with_url_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.url_prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = Some(port);
        self
    }

    /// Register system schemas that are their own single internal schema
    pub fn with_system_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for schema in schemas {
            let schema = schema.into();
            self.system_schemas
                .entry(schema.clone())
                .or_default()
                .insert(schema);
        }
        self
    }

    pub fn with_trunk(mut self, trunk: impl Into<String>) -> Self {
        self.trunk = Some(trunk.into());
        self
    }

    /// Whether this is a branch of another dialect
    pub fn is_branch(&self) -> bool {
        self.trunk.is_some()
    }

    /// Whether `url` starts with one of this dialect's prefixes, ignoring ASCII case
    pub fn matches_url(&self, url: &str) -> bool {
        self.url_prefixes.iter().any(|prefix| {
            url.len() >= prefix.len()
                && url.is_char_boundary(prefix.len())
                && url[..prefix.len()].eq_ignore_ascii_case(prefix)
        })
    }

    /// Whether `schema` is internal to the engine
    pub fn is_system_schema(&self, schema: &str) -> bool {
        self.system_schemas
            .values()
            .any(|schemas| schemas.iter().any(|s| s.eq_ignore_ascii_case(schema)))
    }

    pub fn system_database_schemas(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.system_schemas
    }

    /// Parse host, port and catalog out of a connection URL
    pub fn data_source_metadata(&self, url: &str) -> Result<DataSourceMetaData> {
        DataSourceMetaData::parse(url, self.default_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_character() {
        assert_eq!(QuoteCharacter::BackQuote.wrap("t_order"), "`t_order`");
        assert_eq!(QuoteCharacter::Brackets.wrap("t_order"), "[t_order]");
        assert_eq!(QuoteCharacter::None.wrap("t_order"), "t_order");
        assert_eq!(QuoteCharacter::Quote.unwrap("\"t_order\""), "t_order");
        assert_eq!(QuoteCharacter::BackQuote.unwrap("t_order"), "t_order");
        assert_eq!(QuoteCharacter::Brackets.unwrap("[t_order"), "[t_order");
    }

    #[test]
    fn test_url_matching() {
        let mysql = DialectDescriptor::new("MySQL", QuoteCharacter::BackQuote)
            .with_url_prefixes(["jdbc:mysql:", "mysql:"]);

        assert!(mysql.matches_url("jdbc:mysql://127.0.0.1:3306/foo_ds"));
        assert!(mysql.matches_url("MySQL://db/app"));
        assert!(!mysql.matches_url("jdbc:mariadb://db/app"));
        assert!(!mysql.matches_url("my"));
    }

    #[test]
    fn test_system_schemas() {
        let mysql = DialectDescriptor::new("MySQL", QuoteCharacter::BackQuote)
            .with_system_schemas(["information_schema", "mysql"]);

        assert!(mysql.is_system_schema("INFORMATION_SCHEMA"));
        assert!(mysql.is_system_schema("mysql"));
        assert!(!mysql.is_system_schema("app"));
        assert_eq!(mysql.system_database_schemas().len(), 2);
        assert!(!mysql.is_branch());
        assert!(mysql.clone().with_trunk("SQL92").is_branch());
    }
}
