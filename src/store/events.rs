//! Store change notifications

use crate::model::StatKey;
use serde::Serialize;

/// Where the current snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Network,
    Cache,
    Fallback,
}

/// Result of a `load()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub origin: DataOrigin,
    /// Advisory message, if any was set
    pub error: Option<String>,
}

/// Why a sync attempt did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    EmptyQueue,
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { items: usize },
    Skipped(SkipReason),
}

/// Published on every state change so consumers can re-render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    Loaded { origin: DataOrigin },
    StatsUpdated { key: StatKey, value: u64 },
    NotificationRead { id: u32 },
    NotificationAdded { id: u32 },
    QueueChanged { len: usize },
    Synced { items: usize },
    SyncFailed { error: String },
    ConnectivityChanged { online: bool },
    AdvisoryChanged { message: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = StoreEvent::Loaded {
            origin: DataOrigin::Cache,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"event": "loaded", "origin": "cache"})
        );

        let event = StoreEvent::StatsUpdated {
            key: StatKey::ActiveSites,
            value: 250,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap()["key"],
            serde_json::json!("activeSites")
        );
    }
}
