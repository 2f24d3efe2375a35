use crate::entity::{Entity, SnapshotRecord};
use async_trait::async_trait;
use std::fmt;

pub mod config;
mod http;
mod loader;

pub use config::SnapshotConfig;
pub use http::{parse_entities, parse_records, HttpSnapshotSource};
pub use loader::SnapshotLoader;


/// Why a snapshot could not be applied
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, timeout or body read failure
    Transport(String),
    /// Non-success HTTP status
    Status(u16),
    /// Response body was not a list of complete entities
    Decode(String),
    /// No activation was current when the fetch started or completed;
    /// the result was thrown away
    Discarded,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(e) => write!(f, "snapshot request failed: {}", e),
            FetchError::Status(code) => write!(f, "snapshot request returned status {}", code),
            FetchError::Decode(e) => write!(f, "snapshot response is invalid: {}", e),
            FetchError::Discarded => write!(f, "snapshot discarded: no active session"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Request/response collaborator returning the full entity list.
///
/// Implementations must return complete entities or fail; partial records
/// are never acceptable.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Entity>, FetchError>;

    /// Fetch with per-record knowledge of which fields were not reported.
    /// Sources whose records always carry every field can rely on the default.
    async fn fetch_records(&self) -> Result<Vec<SnapshotRecord>, FetchError> {
        Ok(self
            .fetch()
            .await?
            .into_iter()
            .map(SnapshotRecord::from)
            .collect())
    }
}
