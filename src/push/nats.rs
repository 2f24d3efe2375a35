use crate::push::{PushChannel, PushMessage, PushStream};
use anyhow::{Context, Result};
use async_nats::{ConnectOptions, Event};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// NATS configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Subject (wildcards allowed) carrying status events
    #[serde(default = "default_subject")]
    pub subject: String,

    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_url() -> String {
    std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
}

fn default_subject() -> String {
    "fleet.status.>".to_string()
}

fn default_client_name() -> String {
    "fleetlive".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            subject: default_subject(),
            client_name: default_client_name(),
        }
    }
}

/// Push channel backed by a core NATS subscription
pub struct NatsPushChannel {
    client: async_nats::Client,
    subject: String,
}

impl NatsPushChannel {
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = ConnectOptions::new()
            .name(&config.client_name)
            .event_callback(|event| async move {
                match event {
                    Event::Connected => info!("NATS connected"),
                    Event::Disconnected => warn!("NATS disconnected, client will reconnect"),
                    Event::ServerError(e) => error!(error = %e, "NATS server error"),
                    Event::ClientError(e) => error!(error = %e, "NATS client error"),
                    other => info!(event = %other, "NATS event"),
                }
            })
            .connect(&config.url)
            .await
            .context("Failed to connect to NATS")?;

        Ok(Self {
            client,
            subject: config.subject.clone(),
        })
    }

    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }
}

#[async_trait]
impl PushChannel for NatsPushChannel {
    async fn subscribe(&self) -> Result<PushStream> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to '{}'", self.subject))?;

        info!(subject = %self.subject, "Subscribed to status events");

        Ok(subscriber
            .map(|msg| PushMessage {
                subject: msg.subject.to_string(),
                payload: msg.payload.to_vec(),
            })
            .boxed())
    }
}
