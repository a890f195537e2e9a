//! WolfProbe - Storage Node Discovery CLI
//!
//! Single-shot inspection of configured storage nodes: dialect
//! resolution, replication topology and database time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfprobe::config::{LoggingConfig, NodeConfig, ProbeConfig};
use wolfprobe::connection::{ConnectionSource, MySqlConnectionSource};
use wolfprobe::datetime::DatabaseDatetimeService;
use wolfprobe::dialect::{DialectDescriptor, DialectRegistry};
use wolfprobe::discovery::DiscoveryAlgorithmRegistry;
use wolfprobe::error::{Error, Result};

/// WolfProbe - Storage Node Discovery for Heterogeneous Databases
#[derive(Parser)]
#[command(name = "wolfprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfprobe.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered dialects
    Dialects,

    /// Resolve the dialect and metadata of a connection URL
    Resolve {
        /// Connection URL, e.g. jdbc:mysql://db-1:3306/app
        url: String,

        /// Resolve by dialect name instead of by URL
        #[arg(long = "type")]
        storage_type: Option<String>,
    },

    /// Probe the topology of every configured node once
    Probe {
        /// Only probe the node with this data source name
        #[arg(short, long)]
        node: Option<String>,
    },

    /// Read the current time from the configured datetime storage
    Now,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it loads
    let logging = ProbeConfig::from_file(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(cli.log_level.as_deref().unwrap_or(&logging.level), &logging);

    match cli.command {
        Commands::Dialects => {
            run_dialects(&cli.config)
        }
        Commands::Resolve { url, storage_type } => {
            run_resolve(&cli.config, url, storage_type)
        }
        Commands::Probe { node } => {
            run_probe(&cli.config, node).await
        }
        Commands::Now => {
            run_now(&cli.config).await
        }
        Commands::Validate => {
            run_validate(&cli.config)
        }
    }
}

/// Initialize logging
fn init_logging(level: &str, logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Dialects from the config file when present, otherwise the built-in table
fn load_dialects(config_path: &Path) -> Result<DialectRegistry> {
    if config_path.exists() {
        ProbeConfig::from_file(config_path)?.dialect_registry()
    } else {
        Ok(DialectRegistry::builtin())
    }
}

/// Open a lazily connecting source for a node of `dialect`
fn open_source(config: &ProbeConfig, dialect: &DialectDescriptor, url: &str) -> Result<MySqlConnectionSource> {
    match dialect.driver.as_deref() {
        Some("mysql") => MySqlConnectionSource::connect_lazy(url, config.connect_timeout(), config.pool_size),
        _ => Err(Error::Config(format!(
            "no bundled driver for dialect '{}'",
            dialect.name
        ))),
    }
}

/// List registered dialects
fn run_dialects(config_path: &Path) -> Result<()> {
    let dialects = load_dialects(config_path)?;

    println!("{:<12} {:<12} {:<8} URL PREFIXES", "DIALECT", "TRUNK", "PORT");
    for descriptor in dialects.descriptors() {
        println!(
            "{:<12} {:<12} {:<8} {}",
            descriptor.name,
            descriptor.trunk.as_deref().unwrap_or("-"),
            descriptor.default_port.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            descriptor.url_prefixes.join(", ")
        );
    }
    Ok(())
}

/// Resolve a URL to its dialect, trunk and metadata
fn run_resolve(config_path: &Path, url: String, storage_type: Option<String>) -> Result<()> {
    let dialects = load_dialects(config_path)?;

    let dialect = match storage_type.as_deref() {
        Some(name) => dialects.resolve(name)?,
        None => dialects.resolve_from_url(&url)?,
    };
    let trunk = dialects.resolve_trunk(&dialect.name)?;
    let metadata = dialect.data_source_metadata(&url)?;

    println!("Dialect:   {}", dialect.name);
    println!("Trunk:     {}", trunk.name);
    println!("Quote:     {}", dialect.quote.wrap("identifier"));
    println!("Driver:    {}", dialect.driver.as_deref().unwrap_or("(none)"));
    println!("Host:      {}", metadata.hostname);
    println!("Port:      {}", metadata.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
    println!("Catalog:   {}", metadata.catalog.as_deref().unwrap_or("-"));
    println!("Schema:    {}", metadata.schema.as_deref().unwrap_or("-"));
    Ok(())
}

/// Probe every configured node concurrently and print a JSON report
async fn run_probe(config_path: &Path, only: Option<String>) -> Result<()> {
    let config = ProbeConfig::from_file(config_path)?;
    let dialects = config.dialect_registry()?;
    let algorithms = config.algorithm_registry();

    let nodes: Vec<&NodeConfig> = config
        .nodes
        .iter()
        .filter(|node| only.as_deref().map_or(true, |name| node.data_source_name == name))
        .collect();

    if nodes.is_empty() {
        return Err(Error::Config("no matching nodes configured".into()));
    }

    tracing::info!("Probing {} storage node(s)", nodes.len());

    let reports = futures::future::join_all(
        nodes
            .iter()
            .map(|node| probe_node(&config, &dialects, &algorithms, node)),
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&reports).unwrap_or_default());
    Ok(())
}

async fn probe_node(
    config: &ProbeConfig,
    dialects: &DialectRegistry,
    algorithms: &DiscoveryAlgorithmRegistry,
    node: &NodeConfig,
) -> serde_json::Value {
    match try_probe_node(config, dialects, algorithms, node).await {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(data_source_name = %node.data_source_name, "Probe failed: {}", e);
            json!({
                "data_source_name": node.data_source_name,
                "error": e.to_string(),
            })
        }
    }
}

async fn try_probe_node(
    config: &ProbeConfig,
    dialects: &DialectRegistry,
    algorithms: &DiscoveryAlgorithmRegistry,
    node: &NodeConfig,
) -> Result<serde_json::Value> {
    let dialect = node.dialect(dialects)?;
    let algorithm = algorithms.resolve(dialects, &dialect.name, &node.topology)?;
    let source = open_source(config, dialect, &node.url)?;

    let name = node.data_source_name.as_str();
    let report = {
        let mut conn = source.acquire().await?;

        let status = algorithm
            .load_highly_available_status(conn.as_mut())
            .await
            .map(|status| status.to_json());
        let primary = algorithm.find_primary_instance(name, conn.as_mut()).await;
        let storage_node = algorithm.storage_node_data_source(conn.as_mut()).await;

        json!({
            "data_source_name": name,
            "dialect": dialect.name,
            "algorithm": algorithm.type_name(),
            "status": outcome(name, "status", status),
            "primary": outcome(name, "primary", primary),
            "storage_node": outcome(name, "storage_node", storage_node),
        })
    };

    source.close().await;
    Ok(report)
}

/// Render one probe result, logging failures
fn outcome<T: Serialize>(data_source_name: &str, operation: &str, result: Result<T>) -> serde_json::Value {
    match result {
        Ok(value) => serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        Err(e) => {
            if e.is_standalone_signal() {
                tracing::info!(data_source_name, operation, "{}", e);
            } else {
                tracing::warn!(data_source_name, operation, "{}", e);
            }
            json!({
                "error": e.to_string(),
                "retryable": e.is_retryable(),
            })
        }
    }
}

/// Read the configured storage's clock once
async fn run_now(config_path: &Path) -> Result<()> {
    let config = ProbeConfig::from_file(config_path)?;
    let datetime = config
        .datetime
        .as_ref()
        .ok_or_else(|| Error::Config("no [datetime] storage configured".into()))?;

    let dialects = Arc::new(config.dialect_registry()?);
    let dialect = datetime.dialect(&dialects)?;
    let source = open_source(&config, dialect, &datetime.url)?;

    let service = DatabaseDatetimeService::with_registries(
        dialect.name.clone(),
        Arc::new(source.clone()),
        Arc::clone(&dialects),
        Arc::new(config.datetime_providers()),
    );

    let result = service.get_datetime().await;
    source.close().await;

    let now = result?;
    println!("{}", now.to_rfc3339());
    Ok(())
}

/// Validate configuration file
fn run_validate(config_path: &Path) -> Result<()> {
    match ProbeConfig::from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Nodes: {}", config.nodes.len());
            for node in &config.nodes {
                println!("    {} ({})", node.data_source_name, node.topology);
            }
            println!("  Extra Dialects: {}", config.dialects.len());
            println!(
                "  Datetime Source: {}",
                if config.datetime.is_some() { "configured" } else { "none" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}
