//! Application Data Store
//!
//! - **data**: the [`DataStore`] itself (load, mutations, offline queue, sync)
//! - **events**: change notifications and operation outcomes
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use jaldrishti::connectivity::Connectivity;
//! use jaldrishti::fetch::{HttpSnapshotSource, SnapshotSourceConfig};
//! use jaldrishti::storage::MemoryStore;
//! use jaldrishti::store::{DataStore, StoreConfig, StoreDeps};
//! use jaldrishti::sync::LoggingSubmitter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpSnapshotSource::new(SnapshotSourceConfig::default())?;
//!     let deps = StoreDeps::new(
//!         Arc::new(source),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(LoggingSubmitter),
//!         Connectivity::new(true),
//!     );
//!     let store = DataStore::new(deps, StoreConfig::default());
//!
//!     let report = store.load().await;
//!     println!("loaded from {:?}", report.origin);
//!
//!     store.add_to_offline_queue("gauge-reading", serde_json::json!({"site": 1, "level": 7.1}))?;
//!     store.sync_offline_queue().await?;
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod events;

pub use data::{DataStore, StoreConfig, StoreDeps, OFFLINE_CACHED_MESSAGE, OFFLINE_PENDING_MESSAGE};
pub use error::{StoreError, StoreResult};
pub use events::{DataOrigin, LoadReport, SkipReason, StoreEvent, SyncOutcome};
