use crate::entity::Field;
use serde::{Deserialize, Serialize};

/// Configuration for the notification dispatcher
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Fields whose transitions produce notifications
    #[serde(default = "default_watched_fields")]
    pub watched_fields: Vec<Field>,

    /// Noun used in messages ("Truck is now reachable")
    #[serde(default = "default_entity_noun")]
    pub entity_noun: String,

    /// Prefix of the notification title ("TRUCK-7")
    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,

    #[serde(default = "default_action_label")]
    pub action_label: String,

    /// Deep-link target; `{id}` is replaced by the entity id
    #[serde(default = "default_action_route")]
    pub action_route: String,

    #[serde(default = "default_reachability_display_ms")]
    pub reachability_display_ms: u64,

    #[serde(default = "default_queue_display_ms")]
    pub queue_display_ms: u64,

    #[serde(default = "default_display_ms")]
    pub default_display_ms: u64,

    /// Also notify on field changes carried by a snapshot refresh
    #[serde(default)]
    pub notify_on_snapshot: bool,

    /// Notifications buffered per subscriber before it lags
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_watched_fields() -> Vec<Field> {
    vec![Field::Reachable, Field::Queued]
}

fn default_entity_noun() -> String {
    "Truck".to_string()
}

fn default_title_prefix() -> String {
    "TRUCK-".to_string()
}

fn default_action_label() -> String {
    "See details".to_string()
}

fn default_action_route() -> String {
    "/management/truck/{id}".to_string()
}

fn default_reachability_display_ms() -> u64 {
    8000
}

fn default_queue_display_ms() -> u64 {
    20000
}

fn default_display_ms() -> u64 {
    8000
}

fn default_capacity() -> usize {
    256
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            watched_fields: default_watched_fields(),
            entity_noun: default_entity_noun(),
            title_prefix: default_title_prefix(),
            action_label: default_action_label(),
            action_route: default_action_route(),
            reachability_display_ms: default_reachability_display_ms(),
            queue_display_ms: default_queue_display_ms(),
            default_display_ms: default_display_ms(),
            notify_on_snapshot: false,
            capacity: default_capacity(),
        }
    }
}
