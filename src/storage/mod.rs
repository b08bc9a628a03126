//! Local persistent storage
//!
//! The client keeps four opportunistic caches (snapshot, offline queue, theme,
//! danger-zone flag) in a string key-value store:
//!
//! - **kv**: the [`KeyValueStore`] trait, JSON helpers, and an in-memory store
//! - **file**: a crash-safe store with one checksummed file per key
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use jaldrishti::storage::{FileStore, JsonStoreExt, KeyValueStore, THEME_KEY};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::open("./jaldrishti_data")?;
//!     store.set(THEME_KEY, "boost")?;
//!     store.set_json("recent-sites", &vec![1, 3, 5])?;
//!     assert_eq!(store.get(THEME_KEY)?.as_deref(), Some("boost"));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod file;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use kv::{
    JsonStoreExt, KeyValueStore, MemoryStore, CACHED_DATA_KEY, DANGER_ZONE_KEY,
    OFFLINE_QUEUE_KEY, THEME_KEY,
};
