//! Data store error types

use crate::storage::StorageError;
use crate::sync::SubmitError;
use thiserror::Error;

/// Errors surfaced by data store operations
///
/// Loading never fails; these only come from writes that must reach local
/// storage and from sync attempts.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local storage write failed; in-memory state was left unchanged
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The submitter rejected or could not deliver the batch
    #[error("Sync failed: {0}")]
    Sync(#[from] SubmitError),
}

pub type StoreResult<T> = Result<T, StoreError>;
