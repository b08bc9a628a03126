//! HTTP snapshot source

use super::{FetchError, SnapshotSource};
use crate::model::AppData;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Configuration for the HTTP snapshot source
#[derive(Debug, Clone)]
pub struct SnapshotSourceConfig {
    /// Full URL of the JSON resource (e.g., "http://localhost:8090/data.json")
    pub url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for SnapshotSourceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8090/data.json".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

/// Fetches the snapshot with a single unauthenticated `GET`
pub struct HttpSnapshotSource {
    client: Client,
    config: SnapshotSourceConfig,
}

impl HttpSnapshotSource {
    pub fn new(config: SnapshotSourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SnapshotSourceConfig {
        &self.config
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<AppData, FetchError> {
        tracing::debug!(url = %self.config.url, "Fetching dashboard snapshot");

        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
