use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub use crate::lifecycle::LifecycleConfig;
pub use crate::notification::NotificationConfig;
pub use crate::push::NatsConfig;
pub use crate::snapshot::SnapshotConfig;

/// Complete fleetlive configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Buffered changes per store subscriber before it lags
    #[serde(default = "default_change_capacity")]
    pub change_capacity: usize,
}

fn default_change_capacity() -> usize {
    crate::store::DEFAULT_CHANGE_CAPACITY
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            change_capacity: default_change_capacity(),
        }
    }
}

impl FleetConfig {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`:
    /// - `NATS_URL` -> `nats.url`
    /// - `FLEETLIVE_SNAPSHOT_URL` -> `snapshot.base_url`
    /// - `FLEETLIVE_REFRESH_SECONDS` -> `snapshot.refresh_interval_seconds`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("NATS_URL") {
            self.nats.url = url;
        }
        if let Some(url) = lookup("FLEETLIVE_SNAPSHOT_URL") {
            self.snapshot.base_url = url;
        }
        if let Some(seconds) = lookup("FLEETLIVE_REFRESH_SECONDS") {
            match seconds.parse() {
                Ok(seconds) => self.snapshot.refresh_interval_seconds = seconds,
                Err(e) => warn!(value = %seconds, error = %e, "Ignoring invalid FLEETLIVE_REFRESH_SECONDS"),
            }
        }
    }
}

/// Load configuration from a TOML file, then apply environment overrides
pub fn load_config(path: impl AsRef<Path>) -> Result<FleetConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config: FleetConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.apply_env();
    Ok(config)
}
