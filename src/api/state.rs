//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::api::error::{ApiError, ApiResult};
use crate::model::{AppData, OfflineQueueItem};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Snapshot served at `/data.json`
    pub snapshot: Arc<AppData>,
    /// Offline actions received from clients, in arrival order
    pub received: Arc<RwLock<ReceivedLog>>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

/// Items received through the offline-batch endpoint
#[derive(Debug, Default)]
pub struct ReceivedLog {
    items: Vec<OfflineQueueItem>,
    ids: HashSet<String>,
}

impl ReceivedLog {
    /// Append items not seen before; returns how many were new
    pub fn extend(&mut self, items: Vec<OfflineQueueItem>) -> usize {
        let mut added = 0;
        for item in items {
            if self.ids.insert(item.id.clone()) {
                self.items.push(item);
                added += 1;
            }
        }
        added
    }

    pub fn items(&self) -> &[OfflineQueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl AppState {
    pub fn new(snapshot: AppData, config: ServerConfig) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            received: Arc::new(RwLock::new(ReceivedLog::default())),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Read and validate a snapshot file, or use the built-in snapshot
    pub fn load_snapshot(path: Option<&Path>) -> ApiResult<AppData> {
        let Some(path) = path else {
            return Ok(AppData::fallback());
        };

        let bytes = std::fs::read(path)?;
        let data: AppData = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Snapshot(format!("{}: {}", path.display(), e)))?;
        data.validate()
            .map_err(|e| ApiError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Ok(data)
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins; any origin when empty
    pub cors_origins: Vec<String>,
    /// Maximum offline batch size
    pub max_batch_items: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            cors_origins: Vec::new(),
            max_batch_items: 1_000,
        }
    }
}

impl ServerConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&crate::config::ApiConfig> for ServerConfig {
    fn from(config: &crate::config::ApiConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors_origins: config.cors_origins.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_received_log_dedupes() {
        let mut log = ReceivedLog::default();
        let a = OfflineQueueItem::new("reading", serde_json::json!(1), 1);
        let b = OfflineQueueItem::new("reading", serde_json::json!(2), 2);

        assert_eq!(log.extend(vec![a.clone(), b]), 2);
        assert_eq!(log.extend(vec![a]), 0);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_load_snapshot_defaults_to_builtin() {
        let data = AppState::load_snapshot(None).unwrap();
        assert_eq!(data.stats.active_sites, 247);
    }

    #[test]
    fn test_load_snapshot_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, "{\"stats\": 1}").unwrap();

        let err = AppState::load_snapshot(Some(&path)).unwrap_err();
        assert!(matches!(err, ApiError::Snapshot(_)));
    }

    #[test]
    fn test_load_snapshot_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        let mut data = AppData::fallback();
        data.stats.community_reports = 400;
        std::fs::write(&path, serde_json::to_vec(&data).unwrap()).unwrap();

        let loaded = AppState::load_snapshot(Some(&path)).unwrap();
        assert_eq!(loaded.stats.community_reports, 400);
    }
}
