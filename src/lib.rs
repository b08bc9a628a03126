//! # JalDrishti
//!
//! Client core for the JalDrishti water-level monitoring dashboard. Field
//! workers are often offline, so everything here degrades gracefully: the
//! dashboard snapshot falls back to a local cache and then to built-in data,
//! and write actions wait in a durable queue until connectivity returns.
//!
//! ## Modules
//!
//! - [`store`]: the application data store (snapshot, notifications, offline queue)
//! - [`storage`]: local key-value persistence
//! - [`fetch`]: bootstrap snapshot source
//! - [`sync`]: offline batch submission
//! - [`connectivity`]: online/offline state
//! - [`theme`]: theme and danger-zone preferences
//! - [`safety`]: dead-man switch and fall-detection countdowns
//! - [`capabilities`]: evidence ledger, AI confidence, drone telemetry
//! - [`api`]: the field hub's REST API with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jaldrishti::{
//!     Connectivity, DataStore, FileStore, HttpBatchSubmitter, HttpSnapshotSource, StoreConfig,
//!     StoreDeps, SnapshotSourceConfig, SubmitterConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let deps = StoreDeps::new(
//!         Arc::new(HttpSnapshotSource::new(SnapshotSourceConfig::default())?),
//!         Arc::new(FileStore::open("./jaldrishti_data")?),
//!         Arc::new(HttpBatchSubmitter::new(SubmitterConfig::default())?),
//!         Connectivity::new(true),
//!     );
//!     let store = Arc::new(DataStore::new(deps, StoreConfig::default()));
//!     let watcher = Arc::clone(&store).watch_connectivity();
//!
//!     let report = store.load().await;
//!     println!("{} unread notifications ({:?})", store.unread_notifications(), report.origin);
//!
//!     store.shutdown();
//!     watcher.await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod capabilities;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod fetch;
pub mod model;
pub mod safety;
pub mod storage;
pub mod store;
pub mod sync;
pub mod theme;

// Re-export top-level types for convenience
pub use model::{
    Alert, AlertSeverity, AppData, MonitoringSite, Notification, NotificationType,
    OfflineQueueItem, SiteStatus, StatKey, Stats,
};

pub use storage::{FileStore, JsonStoreExt, KeyValueStore, MemoryStore, StorageError, StorageResult};

pub use store::{
    DataOrigin, DataStore, LoadReport, SkipReason, StoreConfig, StoreDeps, StoreError,
    StoreEvent, StoreResult, SyncOutcome,
};

pub use fetch::{FetchError, HttpSnapshotSource, SnapshotSource, SnapshotSourceConfig};

pub use sync::{
    BatchReceipt, BatchSubmitter, HttpBatchSubmitter, LoggingSubmitter, SubmitError,
    SubmitterConfig, SyncStatus,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use connectivity::Connectivity;

pub use theme::{RecordingRoot, RootAttributes, Theme, ThemeError, ThemeState, ThemeStore};

pub use safety::{Countdown, CountdownEvent, CountdownState, SafetyEvent, SafetyMonitor};

pub use capabilities::{
    CapabilityError, ConfidenceScorer, DroneTelemetry, EvidenceLedger, SimulatedFleet,
    SimulatedLedger, SimulatedScorer,
};

pub use api::{build_router, serve, ApiError, AppState, ServerConfig};

pub use config::{Config, ConfigError, LoggingConfig};
