//! Bootstrap Snapshot Fetch
//!
//! The data store pulls its snapshot through a [`SnapshotSource`]. The
//! production source is a single HTTP `GET` of a static JSON resource; tests
//! inject their own.

mod http;

pub use http::{HttpSnapshotSource, SnapshotSourceConfig};

use crate::model::AppData;
use async_trait::async_trait;
use thiserror::Error;

/// Supplies the current dashboard snapshot
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<AppData, FetchError>;
}

/// Errors that can occur while fetching the snapshot
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Snapshot source unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid snapshot payload: {0}")]
    Decode(String),

    #[error("Request timeout")]
    Timeout,
}

impl FetchError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Unavailable
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Request(e)
        }
    }
}
