//! prime-inventory - Main entry point
//!
//! Builds an Ansible inventory from Cisco Prime Infrastructure and prints
//! it in the `ansible-inventory --list` / `--host` JSON format.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use prime_core::{Inventory, JsonFileCache, MemoryCache, ResponseCache};
use prime_sync::{
    populate, BasicAuthTransport, CachedFetcher, PrimeClient, SyncOptions, SyncReport,
};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "prime-inventory")]
#[command(about = "Ansible dynamic inventory for Cisco Prime Infrastructure")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "prime-inventory.toml")]
    config: PathBuf,

    /// Prime API base URL
    #[arg(long, env = "CISCOPRIME_API_URL")]
    api_url: Option<String>,

    /// Prime username
    #[arg(long, env = "CISCOPRIME_USER")]
    api_user: Option<String>,

    /// Prime password
    #[arg(long, env = "CISCOPRIME_PASSWORD", hide_env_values = true)]
    api_password: Option<String>,

    /// Print the whole inventory (default)
    #[arg(long, conflicts_with = "host")]
    list: bool,

    /// Print the variables of a single host
    #[arg(long)]
    host: Option<String>,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ignore cached responses and refetch everything
    #[arg(long)]
    refresh_cache: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

fn init_logging(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // stdout carries the inventory document
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(true);

    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = builder.with_env_filter(EnvFilter::from_default_env()).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = builder.with_max_level(level).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn sync<C: ResponseCache>(
    settings: config::Settings,
    cache: C,
) -> Result<(Inventory, SyncReport)> {
    let transport =
        BasicAuthTransport::new(settings.http).context("Failed to create HTTP client")?;
    let fetcher = CachedFetcher::new(transport, cache, settings.cache_key, settings.cache);
    let mut client = PrimeClient::new(fetcher, &settings.endpoint, settings.max_results);

    let options = SyncOptions {
        exclude_unmanaged: settings.exclude_unmanaged,
    };
    let mut inventory = Inventory::new();
    let result = populate(&mut client, &mut inventory, &options);

    // Keep whatever was fetched, even from a failed run
    if let Err(e) = client.flush_cache() {
        warn!(error = %e, "Failed to write response cache");
    }
    let report = result
        .with_context(|| format!("Failed to build inventory from {}", settings.endpoint))?;

    info!(
        network_calls = client.fetcher().network_calls(),
        "Prime queries complete"
    );
    Ok((inventory, report))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("prime-inventory v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let config = config::load_config(&args.config)?;
    let overrides = config::Overrides {
        endpoint: args.api_url,
        user: args.api_user,
        password: args.api_password,
        force_update: args.refresh_cache,
    };
    let settings = config.resolve(overrides, &args.config)?;

    info!(
        endpoint = %settings.endpoint,
        cache = settings.cache.enabled,
        cache_key = %settings.cache_key,
        cache_dir = %settings.cache_dir.display(),
        "Configuration loaded"
    );

    let (inventory, report) = if settings.cache.enabled {
        let cache = JsonFileCache::new(settings.cache_dir.clone(), settings.cache_timeout)
            .context("Failed to open cache directory")?;
        sync(settings, cache)?
    } else {
        sync(settings, MemoryCache::new())?
    };

    info!(
        hosts = report.hosts,
        groups = report.groups,
        excluded = report.hosts_excluded,
        "Inventory ready"
    );

    let document = match args.host.as_deref() {
        Some(host) if !args.list => inventory
            .host_vars_json(host)
            .unwrap_or_else(|| Value::Object(Default::default())),
        _ => inventory.to_list_json(),
    };
    let rendered = serde_json::to_string_pretty(&document)?;

    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", rendered),
    }

    Ok(())
}
