use anyhow::{Context, Result};
use fleetlive::config::{load_config, FleetConfig};
use fleetlive::lifecycle::LifecycleController;
use fleetlive::push::NatsPushChannel;
use fleetlive::snapshot::HttpSnapshotSource;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetlive=info".into()),
        )
        .init();

    info!("fleetlive starting...");

    let config = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FLEETLIVE_CONFIG").ok())
    {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            load_config(&path)?
        }
        None => {
            info!("No config file given, using defaults");
            let mut config = FleetConfig::default();
            config.apply_env();
            config
        }
    };

    let source = HttpSnapshotSource::new(&config.snapshot)?;
    info!(url = %source.url(), "Snapshot source ready");

    let channel = NatsPushChannel::connect(&config.nats).await?;

    let mut controller =
        LifecycleController::from_config(&config, Arc::new(source), Arc::new(channel));

    // Log notifications until the dispatcher goes away
    let mut notifications = controller.dispatcher().subscribe();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(n) => info!(
                    entity_id = %n.entity_id,
                    title = %n.title,
                    message = %n.message,
                    action = %n.suggested_action.target,
                    "Notification"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Notification log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    controller.activate().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    controller.deactivate().await;

    Ok(())
}
