//! Data Transfer Objects
//!
//! Response bodies that are not domain types. Batch requests and receipts
//! reuse [`crate::sync::BatchRequest`] and [`crate::sync::BatchReceipt`] so
//! client and server agree on the wire shape.

use crate::model::OfflineQueueItem;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Application version
    pub version: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Offline actions received so far
    pub received_items: usize,
}

/// Items received through the offline-batch endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivedResponse {
    pub count: usize,
    pub items: Vec<OfflineQueueItem>,
}
