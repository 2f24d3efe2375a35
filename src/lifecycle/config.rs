use serde::{Deserialize, Serialize};

/// Configuration for the lifecycle controller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Fetch a snapshot as soon as the controller becomes active
    #[serde(default = "default_true")]
    pub load_snapshot_on_activate: bool,

    /// Empty the store on deactivation so the next activation starts fresh
    #[serde(default = "default_true")]
    pub clear_on_deactivate: bool,

    /// How long deactivation waits for a task before aborting it
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            load_snapshot_on_activate: true,
            clear_on_deactivate: true,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}
