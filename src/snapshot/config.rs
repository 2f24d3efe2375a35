use serde::{Deserialize, Serialize};

/// Configuration for snapshot fetching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Base URL of the fleet API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the endpoint listing every tracked entity
    #[serde(default = "default_list_path")]
    pub list_path: String,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Interval between periodic refreshes (seconds, 0 = disabled)
    #[serde(default)]
    pub refresh_interval_seconds: u64,
}

fn default_base_url() -> String {
    std::env::var("FLEETLIVE_SNAPSHOT_URL").unwrap_or_else(|_| "http://localhost:8069".to_string())
}

fn default_list_path() -> String {
    "/trucks".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            list_path: default_list_path(),
            request_timeout_ms: default_request_timeout_ms(),
            refresh_interval_seconds: 0,
        }
    }
}
