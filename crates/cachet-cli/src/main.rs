//! # Cachet CLI
//!
//! Loads configuration, wires a Redis store through the DI module and runs
//! one cache operation.

mod cli;

use anyhow::{Context, Result};
use cachet_config::ConfigLoader;
use cachet_core::init_telemetry;
use cachet_service::di::{build_store_module, StoreResolver};
use cachet_service::metrics::register_metrics;
use cachet_service::{CacheService, TracingObserver};
use clap::Parser;
use cli::{Cli, Commands};
use std::time::Duration;
use tracing::debug;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let loader = match cli.config_dir.as_deref() {
        Some(dir) => ConfigLoader::new(dir),
        None => ConfigLoader::from_default_location(),
    }
    .context("Failed to load configuration")?;
    let config = loader.get().await;

    init_telemetry(&config.observability.telemetry())?;
    if config.observability.metrics_enabled {
        register_metrics();
    }
    debug!("Environment: {}", config.app.environment);

    let module = build_store_module(&config.redis).context("Failed to create store client")?;
    let mut cache = CacheService::from_config(module.store(), &config).with_observer(TracingObserver);
    if let Some(prefix) = cli.prefix {
        cache = cache.with_prefix(prefix);
    }

    match cli.command {
        Commands::Add(args) => {
            let ttl = args.ttl_secs.map(Duration::from_secs);
            let stored = if args.json {
                let value: serde_json::Value =
                    serde_json::from_str(&args.value).context("Value is not valid JSON")?;
                cache.try_add_async(&args.key, &value, ttl, false).await?
            } else {
                cache.try_add_async(&args.key, &args.value, ttl, false).await?
            };
            println!("{}", stored);
        }
        Commands::Get(args) => {
            if args.json {
                let value: serde_json::Value = cache.get_async(&args.key).await?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let value: String = cache.get_async(&args.key).await?;
                println!("{}", value);
            }
        }
        Commands::Exists(args) => {
            println!("{}", cache.exists_async(&args.key).await?);
        }
        Commands::Delete(args) => {
            println!("{}", cache.delete_async(&args.key).await?);
        }
    }

    Ok(())
}
