//! Pollen and dust advisory dashboard service.
//!
//! Fetches pollen forecasts and air-quality health advisories from their
//! upstream APIs on daily schedules, persists normalized batches, and
//! serves the latest advisory categories over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dashboard::config::DashboardConfig;
use dashboard::scheduler::{FreshnessMarkers, IngestScheduler};
use dashboard::server::{self, ServerState};
use dashboard::sources::{DustClient, PollenClient};
use storage::AdvisoryStore;

#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "Pollen and dust advisory ingestion with a dashboard API")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/dashboard.yaml")]
    config: PathBuf,

    /// Database path (overrides configuration)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// HTTP port (overrides configuration)
    #[arg(long, env = "DASHBOARD_PORT")]
    port: Option<u16>,

    /// Pollen API key (overrides configuration)
    #[arg(long, env = "POLLEN_API_KEY")]
    pollen_api_key: Option<String>,

    /// Dust API key (overrides configuration)
    #[arg(long, env = "DUST_API_KEY")]
    dust_api_key: Option<String>,

    /// Run both ingestion workflows once and exit
    #[arg(long)]
    once: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting advisory dashboard service");

    let mut config = DashboardConfig::load(&args.config)?;
    if let Some(key) = args.pollen_api_key {
        config.pollen.api_key = key;
    }
    if let Some(key) = args.dust_api_key {
        config.dust.api_key = key;
    }
    if let Some(path) = args.db_path {
        config.database.path = path;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let pollen_at = config
        .pollen
        .trigger_time()
        .context("Invalid pollen fetch_time")?;
    let dust_at = config
        .dust
        .trigger_time()
        .context("Invalid dust fetch_time")?;

    let store = Arc::new(AdvisoryStore::open(&config.database.path).await?);
    let markers = Arc::new(FreshnessMarkers::new());

    let pollen_client = PollenClient::new(&config.pollen);
    let dust_client = DustClient::new(&config.dust);

    let scheduler = IngestScheduler::new(
        store.clone(),
        markers.clone(),
        pollen_client,
        dust_client,
        pollen_at,
        dust_at,
    );

    if args.once {
        // Single run mode
        info!("Running single ingestion cycle");
        scheduler.run_once().await;
        return Ok(());
    }

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start the dashboard API server
    let server_state = Arc::new(ServerState {
        store: store.clone(),
        markers: markers.clone(),
    });
    let port = config.server.port;
    tokio::spawn(async move {
        if let Err(e) = server::run_server(server_state, port).await {
            tracing::error!(error = %e, "Dashboard server failed");
        }
    });

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    scheduler.run_forever(shutdown_tx.subscribe()).await;

    Ok(())
}
