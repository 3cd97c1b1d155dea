//! # sqlkit Configuration Validator
//!
//! Loads a sqlkit configuration directory for an environment, validates it and
//! prints what a kit built from it would route and cache. Connection strings
//! are never printed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlkit::config::{ConfigLoader, SqlKitConfig};
use sqlkit::routing::ConnectionRouter;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sqlkit-config-validator")]
#[command(about = "Validate sqlkit configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment overlay to apply (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory (default: $SQLKIT_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and print a summary (default)
    Validate,

    /// List connection routes
    Routes,

    /// Print the loaded configuration as JSON with connection strings masked
    Dump,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = load(&cli).and_then(|loader| match &cli.command {
        Some(Commands::Validate) | None => print_summary(&loader),
        Some(Commands::Routes) => print_routes(loader.config()),
        Some(Commands::Dump) => dump(&loader),
    });

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<ConfigLoader> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigLoader::detect_environment);

    ConfigLoader::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .with_context(|| format!("loading configuration for environment '{environment}'"))
}

fn print_summary(loader: &ConfigLoader) -> Result<()> {
    let config = loader.config();

    println!("🔧 Validating sqlkit Configuration");
    println!("Environment: {}", loader.environment());
    println!("Config Directory: {}", loader.config_directory().display());
    println!();

    print_routes(config)?;

    println!();
    match &config.cache {
        Some(cache) => {
            println!("Cache: enabled");
            println!("  expire_seconds: {}", cache.expire_seconds);
            println!("  all_methods_enable_cache: {}", cache.all_methods_enable_cache);
            println!("  max_capacity: {}", cache.max_capacity);
            println!("  key_prefix: {}", cache.key_prefix);
            println!("  single_flight: {}", cache.single_flight);
        }
        None => println!("Cache: disabled"),
    }

    println!();
    println!("Catalog queries: {}", config.queries.len());
    let mut names: Vec<&String> = config.queries.keys().collect();
    names.sort();
    for name in names {
        println!("  - {name}");
    }

    println!();
    println!("✅ Configuration is valid");
    Ok(())
}

fn print_routes(config: &SqlKitConfig) -> Result<()> {
    let router = ConnectionRouter::from_config(config);
    let routes = router.summaries();

    println!("Connections: {}", routes.len());
    for route in routes {
        if route.master_slave {
            println!(
                "  - {} (master-slave, {} replica(s))",
                route.name, route.replicas
            );
        } else {
            println!("  - {} (primary only)", route.name);
        }
    }
    Ok(())
}

fn dump(loader: &ConfigLoader) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&loader.debug_config())
        .context("rendering configuration")?;
    println!("{rendered}");
    Ok(())
}
