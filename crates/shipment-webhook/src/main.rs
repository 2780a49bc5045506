use anyhow::Result;
use clap::Parser;
use shipment_webhook::{AppState, HttpNotifier, ShipmentStore, router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "shipment-webhook", about = "Shipment tracking webhook receiver", version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "shipments.db")]
    database: PathBuf,

    /// Event endpoint for delivered notifications
    #[arg(long, env = "NOTIFY_URL")]
    notify_url: String,

    #[arg(long, env = "NOTIFY_API_KEY", hide_env_values = true)]
    notify_api_key: String,

    /// Notification timeout in seconds
    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value = "15")]
    notify_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let store = ShipmentStore::open(&cli.database)?;
    log::info!("Shipment store at {}", cli.database.display());

    let notifier = HttpNotifier::new(
        &cli.notify_url,
        &cli.notify_api_key,
        Duration::from_secs(cli.notify_timeout_secs),
    )?;
    let app = router(AppState::new(store, Arc::new(notifier)));

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    log::info!("Listening on {}", cli.listen);
    log::info!("  POST /webhooks/fulfillment");
    log::info!("  POST /webhooks/tracking");
    axum::serve(listener, app).await?;

    Ok(())
}
