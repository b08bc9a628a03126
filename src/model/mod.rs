//! Dashboard data model
//!
//! - **types**: snapshot, sites, alerts, notifications, offline queue items
//! - **fallback**: the built-in default snapshot

mod fallback;
pub mod types;

pub use types::{
    Alert, AlertSeverity, AppData, FloodProbability, MonitoringSite, Notification,
    NotificationType, OfflineQueueItem, SiteStatus, StatKey, Stats, TrustMetrics,
    ValidationError, WaterLevelReading,
};
