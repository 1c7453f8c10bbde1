//! Clubsync - Sports Academy Content Server
//!
//! Serves the REST surface the sync clients reconcile against: entity
//! collections with upsert-by-id semantics, weekly fee payments, and the
//! gallery top-five endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clubsync::api::HttpServer;
use clubsync::config::ClubsyncConfig;
use clubsync::error::Result;
use clubsync::store::Store;

/// Clubsync - Sports Academy Content Server
#[derive(Parser)]
#[command(name = "clubsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "clubsync.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the content server
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "clubsync.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Start => run_start(cli.config).await,
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Start the content server
async fn run_start(config_path: PathBuf) -> Result<()> {
    tracing::info!("Starting clubsync server...");

    // A missing config file falls back to defaults so a fresh checkout can
    // run without setup; a present-but-broken file is still an error.
    let config = if config_path.exists() {
        match ClubsyncConfig::from_file(&config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
                tracing::error!("Please check that the config file is valid TOML");
                return Err(e);
            }
        }
    } else {
        tracing::info!(
            "No config file at {:?}, using built-in defaults",
            config_path
        );
        ClubsyncConfig::default()
    };

    let store = Arc::new(Store::new());
    let server = HttpServer::new(config.server.clone(), Arc::clone(&store));

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!("Clubsync shutdown complete");
    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    let config_content = r#"# Clubsync Configuration
# Generated configuration file

[server]
enabled = true
bind_address = "0.0.0.0:4000"
cors_enabled = false

[remote]
base_url = "http://127.0.0.1:4000"
timeout_secs = 30
max_attempts = 3
backoff_base_ms = 1000

[sync]
interval_minutes = 3
retry_interval_minutes = 2
initial_delay_secs = 2

[logging]
level = "info"
format = "pretty"
"#;

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("\nStart the server with: clubsync start --config {}", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match ClubsyncConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Server:         {}", config.server.bind_address);
            println!("  Remote:         {}", config.remote.base_url);
            println!("  Attempts:       {}", config.remote.max_attempts);
            println!("  Sync interval:  {} min", config.sync.interval_minutes);
            println!("  Retry interval: {} min", config.sync.retry_interval_minutes);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}
