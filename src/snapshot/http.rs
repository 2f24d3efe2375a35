use crate::entity::{Coordinates, Entity, EntityId, Field, SnapshotRecord};
use crate::snapshot::{FetchError, SnapshotConfig, SnapshotSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::debug;

/// Entity as listed by the fleet API
#[derive(Debug, Deserialize)]
struct EntityRecord {
    id: EntityId,
    #[serde(rename = "phoneNumber", alias = "phone_number")]
    phone_number: String,
    #[serde(rename = "isReachable", alias = "reachable")]
    reachable: bool,
    #[serde(rename = "isQueued", alias = "queued")]
    queued: bool,
    /// None when absent, Some(None) when sent as null
    #[serde(
        default,
        rename = "coords",
        alias = "location",
        deserialize_with = "reported"
    )]
    location: Option<Option<Coordinates>>,
}

fn reported<'de, D>(deserializer: D) -> Result<Option<Option<Coordinates>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Coordinates>::deserialize(deserializer).map(Some)
}

impl From<EntityRecord> for SnapshotRecord {
    fn from(record: EntityRecord) -> Self {
        let unreported = match record.location {
            Some(_) => Vec::new(),
            None => vec![Field::Location],
        };
        let entity = Entity {
            id: record.id,
            phone_number: record.phone_number,
            reachable: record.reachable,
            queued: record.queued,
            location: record.location.flatten(),
            last_updated: Utc::now(),
        };
        SnapshotRecord::new(entity, unreported)
    }
}

/// Parse a list response body, remembering which fields each record left out.
///
/// The list endpoint normally omits `coords`; an omitted location keeps the
/// stored one, an explicit `null` clears it. Any record missing a required
/// field fails the whole body.
pub fn parse_records(body: &[u8]) -> Result<Vec<SnapshotRecord>, FetchError> {
    let records: Vec<EntityRecord> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(records.into_iter().map(SnapshotRecord::from).collect())
}

/// Parse a list response body into entities; omitted locations read as unknown
pub fn parse_entities(body: &[u8]) -> Result<Vec<Entity>, FetchError> {
    Ok(parse_records(body)?
        .into_iter()
        .map(|record| record.entity)
        .collect())
}

/// Snapshot source backed by the fleet HTTP API (`GET {base_url}{list_path}`)
pub struct HttpSnapshotSource {
    client: Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(config: &SnapshotConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("Failed to build snapshot HTTP client")?;

        let url = format!("{}{}", config.base_url.trim_end_matches('/'), config.list_path);

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HttpSnapshotSource {
    async fn get_body(&self) -> Result<Vec<u8>, FetchError> {
        debug!(url = %self.url, "Fetching snapshot");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Vec<Entity>, FetchError> {
        parse_entities(&self.get_body().await?)
    }

    async fn fetch_records(&self) -> Result<Vec<SnapshotRecord>, FetchError> {
        parse_records(&self.get_body().await?)
    }
}
