//! Data Source Metadata
//!
//! Host, port and catalog parsed from a connection URL.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where a connection URL points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceMetaData {
    pub hostname: String,
    pub port: Option<u16>,
    /// Database / catalog name, if the URL names one
    pub catalog: Option<String>,
    /// Schema from a `currentSchema` parameter
    pub schema: Option<String>,
}

impl DataSourceMetaData {
    /// Parse a URL such as `jdbc:mysql://host:3306/db?x=y`,
    /// `mysql://user:pw@host/db`, `jdbc:sqlserver://host;DatabaseName=db`
    /// or `jdbc:oracle:thin:@host:1521:sid`
    ///
    /// `default_port` fills in a missing port. Fails when no host can be
    /// found or the port is not a number.
    pub fn parse(url: &str, default_port: Option<u16>) -> Result<Self> {
        let unrecognized = || Error::UnrecognizedUrl(url.to_string());
        let body = url.strip_prefix("jdbc:").unwrap_or(url);

        // Oracle thin: "oracle:thin:@host:port:sid" or "oracle:thin:@//host:port/service"
        if let Some((_, target)) = body.split_once(":@").filter(|_| body.starts_with("oracle:")) {
            if !target.starts_with("//") {
                let mut parts = target.splitn(3, ':');
                let hostname = parts.next().filter(|h| !h.is_empty()).ok_or_else(unrecognized)?;
                let port = match parts.next() {
                    Some(p) => Some(p.parse::<u16>().map_err(|_| unrecognized())?),
                    None => default_port,
                };
                return Ok(Self {
                    hostname: hostname.to_string(),
                    port,
                    catalog: parts.next().filter(|c| !c.is_empty()).map(str::to_string),
                    schema: None,
                });
            }
        }

        let (_, rest) = body.split_once("//").ok_or_else(unrecognized)?;

        let authority_end = rest.find(['/', ';', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        // Drop credentials, then keep the first host of a multi-host list
        let hosts = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
        let first = hosts.split(',').next().unwrap_or_default();
        let (hostname, port) = split_host_port(first).ok_or_else(unrecognized)?;

        let port = match port {
            Some(p) => Some(p.parse::<u16>().map_err(|_| unrecognized())?),
            None => default_port,
        };

        let (catalog, schema) = parse_tail(tail);

        Ok(Self {
            hostname: hostname.to_string(),
            port,
            catalog,
            schema,
        })
    }
}

impl fmt::Display for DataSourceMetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.contains(':') {
            write!(f, "[{}]", self.hostname)?;
        } else {
            write!(f, "{}", self.hostname)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(catalog) = &self.catalog {
            write!(f, "/{}", catalog)?;
        }
        Ok(())
    }
}

/// Split `host[:port]` / `[v6]:port`; `None` when the host is empty
fn split_host_port(authority: &str) -> Option<(&str, Option<&str>)> {
    let (host, port) = if let Some(v6) = authority.strip_prefix('[') {
        let (host, after) = v6.split_once(']')?;
        (host, after.strip_prefix(':'))
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return None;
    }
    Some((host, port.filter(|p| !p.is_empty())))
}

/// Catalog and schema from whatever follows the authority
fn parse_tail(tail: &str) -> (Option<String>, Option<String>) {
    let mut catalog = None;
    let mut schema = None;

    let (path, params) = match tail.find(['?', ';']) {
        Some(i) => (&tail[..i], &tail[i + 1..]),
        None => (tail, ""),
    };

    let path = path.trim_start_matches('/');
    if !path.is_empty() {
        catalog = Some(path.to_string());
    }

    for param in params.split(['&', ';']) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("databaseName") || key.eq_ignore_ascii_case("database") {
            catalog.get_or_insert_with(|| value.to_string());
        } else if key.eq_ignore_ascii_case("currentSchema") {
            schema = Some(value.to_string());
        }
    }

    (catalog, schema)
}
