//! Application Data Store
//!
//! Single source of truth for dashboard content. Loads opportunistically from
//! the network, degrades to the local cache and then to the built-in snapshot,
//! and owns the offline queue.
//!
//! State lives in copy-on-write cells: every mutation swaps in a new
//! `Arc<AppData>`, so readers holding an older snapshot never observe a
//! half-applied change. Locks are never held across an `.await`.

use crate::clock::{Clock, SystemClock};
use crate::connectivity::Connectivity;
use crate::fetch::{FetchError, SnapshotSource};
use crate::model::{AppData, Notification, OfflineQueueItem, StatKey};
use crate::storage::{JsonStoreExt, KeyValueStore, StorageError, CACHED_DATA_KEY, OFFLINE_QUEUE_KEY};
use crate::store::error::{StoreError, StoreResult};
use crate::store::events::{DataOrigin, LoadReport, SkipReason, StoreEvent, SyncOutcome};
use crate::sync::{BatchSubmitter, SyncStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

/// Advisory shown when a load fell back while offline
pub const OFFLINE_CACHED_MESSAGE: &str = "You are offline. Showing cached data.";
/// Advisory shown when connectivity drops
pub const OFFLINE_PENDING_MESSAGE: &str =
    "You are offline. Changes will sync when connection is restored.";

/// Collaborators injected into a [`DataStore`]
#[derive(Clone)]
pub struct StoreDeps {
    pub source: Arc<dyn SnapshotSource>,
    pub storage: Arc<dyn KeyValueStore>,
    pub submitter: Arc<dyn BatchSubmitter>,
    pub connectivity: Connectivity,
    pub clock: Arc<dyn Clock>,
}

impl StoreDeps {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        storage: Arc<dyn KeyValueStore>,
        submitter: Arc<dyn BatchSubmitter>,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            source,
            storage,
            submitter,
            connectivity,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Data store tuning
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on the bootstrap fetch
    pub fetch_timeout: Duration,
    /// Attempt a sync right after the reconnect reload
    pub auto_sync_on_reconnect: bool,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            auto_sync_on_reconnect: false,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    data: Option<Arc<AppData>>,
    queue: Arc<Vec<OfflineQueueItem>>,
    error: Option<String>,
    last_sync: Option<SyncStatus>,
}

/// Shared dashboard state
pub struct DataStore {
    deps: StoreDeps,
    config: StoreConfig,
    state: RwLock<State>,
    loading: AtomicBool,
    sync_lock: Mutex<()>,
    events: broadcast::Sender<StoreEvent>,
    shutdown: watch::Sender<bool>,
}

enum LoadFailure {
    Fetch(FetchError),
    Timeout,
    Cancelled,
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadFailure::Fetch(e) => write!(f, "{}", e),
            LoadFailure::Timeout => write!(f, "fetch timed out"),
            LoadFailure::Cancelled => write!(f, "store shut down"),
        }
    }
}

impl DataStore {
    /// Create a store, recovering any queue persisted by a previous session
    ///
    /// No snapshot is available until [`DataStore::load`] completes.
    pub fn new(deps: StoreDeps, config: StoreConfig) -> Self {
        let queue = Self::recover_queue(deps.storage.as_ref());
        if !queue.is_empty() {
            tracing::info!(items = queue.len(), "Recovered offline queue");
        }

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown, _) = watch::channel(false);

        Self {
            deps,
            config,
            state: RwLock::new(State {
                queue: Arc::new(queue),
                ..State::default()
            }),
            loading: AtomicBool::new(false),
            sync_lock: Mutex::new(()),
            events,
            shutdown,
        }
    }

    fn recover_queue(storage: &dyn KeyValueStore) -> Vec<OfflineQueueItem> {
        match storage.get_json::<Vec<OfflineQueueItem>>(OFFLINE_QUEUE_KEY) {
            Ok(Some(queue)) => queue,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable offline queue");
                if let Err(e) = storage.remove(OFFLINE_QUEUE_KEY) {
                    tracing::warn!(error = %e, "Failed to remove unreadable offline queue");
                }
                Vec::new()
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ============================================
    // Read accessors
    // ============================================

    /// Current snapshot, `None` before the first load
    pub fn snapshot(&self) -> Option<Arc<AppData>> {
        self.read_state().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_online(&self) -> bool {
        self.deps.connectivity.is_online()
    }

    /// Advisory message for the UI banner
    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    pub fn unread_notifications(&self) -> usize {
        self.read_state()
            .data
            .as_ref()
            .map(|d| d.unread_notifications())
            .unwrap_or(0)
    }

    pub fn offline_queue(&self) -> Arc<Vec<OfflineQueueItem>> {
        Arc::clone(&self.read_state().queue)
    }

    pub fn last_sync(&self) -> Option<SyncStatus> {
        self.read_state().last_sync.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn set_error(&self, message: Option<String>) {
        let changed = {
            let mut state = self.write_state();
            if state.error == message {
                false
            } else {
                state.error = message.clone();
                true
            }
        };
        if changed {
            self.publish(StoreEvent::AdvisoryChanged { message });
        }
    }

    // ============================================
    // Loading
    // ============================================

    /// Fetch the snapshot, falling back to the cache and then the built-in data
    ///
    /// Always leaves a valid snapshot installed. The pending offline queue is
    /// carried over untouched.
    pub async fn load(&self) -> LoadReport {
        self.loading.store(true, Ordering::SeqCst);
        self.set_error(None);

        let (mut data, origin) = match self.fetch_with_timeout().await {
            Ok(data) => match data.validate() {
                Ok(()) => {
                    self.write_cache(&data);
                    (data, DataOrigin::Network)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Fetched snapshot failed validation, using cached/fallback");
                    self.cached_or_fallback()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch data, using cached/fallback");
                self.cached_or_fallback()
            }
        };

        if origin != DataOrigin::Network && !self.is_online() {
            self.set_error(Some(OFFLINE_CACHED_MESSAGE.to_string()));
        }

        {
            let mut state = self.write_state();
            data.offline_queue = state.queue.as_ref().clone();
            state.data = Some(Arc::new(data));
        }
        self.loading.store(false, Ordering::SeqCst);

        tracing::info!(origin = ?origin, "Dashboard data loaded");
        self.publish(StoreEvent::Loaded { origin });

        LoadReport {
            origin,
            error: self.error(),
        }
    }

    async fn fetch_with_timeout(&self) -> Result<AppData, LoadFailure> {
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            result = tokio::time::timeout(self.config.fetch_timeout, self.deps.source.fetch()) => {
                match result {
                    Ok(fetched) => fetched.map_err(LoadFailure::Fetch),
                    Err(_) => Err(LoadFailure::Timeout),
                }
            }
            _ = shutdown.wait_for(|stopped| *stopped) => Err(LoadFailure::Cancelled),
        }
    }

    fn write_cache(&self, data: &AppData) {
        // The queue has its own key
        let cached = AppData {
            offline_queue: Vec::new(),
            ..data.clone()
        };
        if let Err(e) = self.deps.storage.set_json(CACHED_DATA_KEY, &cached) {
            tracing::warn!(error = %e, "Failed to cache dashboard data");
        }
    }

    fn cached_or_fallback(&self) -> (AppData, DataOrigin) {
        match self.deps.storage.get_json::<AppData>(CACHED_DATA_KEY) {
            Ok(Some(cached)) => match cached.validate() {
                Ok(()) => return (cached, DataOrigin::Cache),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding invalid cached data");
                    self.discard_cache();
                }
            },
            Ok(None) => {}
            Err(StorageError::Serialization(e)) => {
                tracing::warn!(error = %e, "Discarding malformed cached data");
                self.discard_cache();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached data");
            }
        }
        (AppData::fallback(), DataOrigin::Fallback)
    }

    fn discard_cache(&self) {
        if let Err(e) = self.deps.storage.remove(CACHED_DATA_KEY) {
            tracing::warn!(error = %e, "Failed to remove cached data");
        }
    }

    // ============================================
    // Snapshot mutations
    // ============================================

    /// Replace a single stats field; returns false before the first load
    pub fn update_stat(&self, key: StatKey, value: u64) -> bool {
        {
            let mut state = self.write_state();
            let Some(current) = state.data.as_ref() else {
                return false;
            };
            let next = AppData {
                stats: current.stats.with(key, value),
                ..current.as_ref().clone()
            };
            state.data = Some(Arc::new(next));
        }
        self.publish(StoreEvent::StatsUpdated { key, value });
        true
    }

    /// Mark a notification as read
    ///
    /// Returns whether a notification with `id` exists. Unknown ids are a
    /// no-op and repeated calls change nothing.
    pub fn mark_notification_read(&self, id: u32) -> bool {
        {
            let mut state = self.write_state();
            let Some(current) = state.data.as_ref() else {
                return false;
            };
            match current.notifications.iter().find(|n| n.id == id) {
                None => return false,
                Some(n) if n.read => return true,
                Some(_) => {}
            }

            let mut next = current.as_ref().clone();
            for notification in next.notifications.iter_mut().filter(|n| n.id == id) {
                notification.read = true;
            }
            state.data = Some(Arc::new(next));
        }
        tracing::debug!(id, "Notification marked read");
        self.publish(StoreEvent::NotificationRead { id });
        true
    }

    /// Append a notification from a push/poll channel; duplicate ids are ignored
    pub fn push_notification(&self, notification: Notification) -> bool {
        let id = notification.id;
        {
            let mut state = self.write_state();
            let Some(current) = state.data.as_ref() else {
                return false;
            };
            if current.notifications.iter().any(|n| n.id == id) {
                return false;
            }
            let mut next = current.as_ref().clone();
            next.notifications.push(notification);
            state.data = Some(Arc::new(next));
        }
        self.publish(StoreEvent::NotificationAdded { id });
        true
    }

    // ============================================
    // Offline queue
    // ============================================

    /// Queue a write action
    ///
    /// The whole queue is written to local storage before the in-memory queue
    /// changes, so a storage failure leaves both sides as they were.
    pub fn add_to_offline_queue(
        &self,
        kind: impl Into<String>,
        data: serde_json::Value,
    ) -> StoreResult<OfflineQueueItem> {
        let item = OfflineQueueItem::new(kind, data, self.deps.clock.now_millis());

        let len = {
            let mut state = self.write_state();
            let mut queue = state.queue.as_ref().clone();
            queue.push(item.clone());
            self.deps.storage.set_json(OFFLINE_QUEUE_KEY, &queue)?;
            Self::install_queue(&mut state, queue)
        };

        tracing::info!(id = %item.id, kind = %item.kind, queued = len, "Action queued offline");
        self.publish(StoreEvent::QueueChanged { len });
        Ok(item)
    }

    fn install_queue(state: &mut State, queue: Vec<OfflineQueueItem>) -> usize {
        let len = queue.len();
        if let Some(current) = state.data.as_ref() {
            let next = AppData {
                offline_queue: queue.clone(),
                ..current.as_ref().clone()
            };
            state.data = Some(Arc::new(next));
        }
        state.queue = Arc::new(queue);
        len
    }

    /// Submit the pending queue
    ///
    /// Only one attempt runs at a time; a call made while another is in flight
    /// is skipped. On success exactly the submitted items leave the queue, so
    /// actions queued during the submit stay pending. On failure nothing
    /// changes.
    pub async fn sync_offline_queue(&self) -> StoreResult<SyncOutcome> {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            tracing::debug!("Sync already in flight");
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyInFlight));
        };

        if !self.is_online() {
            return Ok(SyncOutcome::Skipped(SkipReason::Offline));
        }

        let batch = self.offline_queue();
        if batch.is_empty() {
            return Ok(SyncOutcome::Skipped(SkipReason::EmptyQueue));
        }

        tracing::info!(items = batch.len(), "Syncing offline queue");
        let start = Instant::now();
        let result = self.deps.submitter.submit(&batch).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_receipt) => {
                let submitted: HashSet<&str> = batch.iter().map(|i| i.id.as_str()).collect();
                let len = {
                    let mut state = self.write_state();
                    let remaining: Vec<OfflineQueueItem> = state
                        .queue
                        .iter()
                        .filter(|item| !submitted.contains(item.id.as_str()))
                        .cloned()
                        .collect();

                    if remaining.is_empty() {
                        self.deps.storage.remove(OFFLINE_QUEUE_KEY)?;
                    } else {
                        self.deps.storage.set_json(OFFLINE_QUEUE_KEY, &remaining)?;
                    }
                    let len = Self::install_queue(&mut state, remaining);
                    state.last_sync = Some(SyncStatus {
                        timestamp: self.deps.clock.now_millis(),
                        items_synced: batch.len(),
                        duration_ms,
                        success: true,
                        error: None,
                    });
                    len
                };

                tracing::info!(items = batch.len(), remaining = len, duration_ms, "Offline queue synced");
                self.publish(StoreEvent::Synced { items: batch.len() });
                self.publish(StoreEvent::QueueChanged { len });
                Ok(SyncOutcome::Synced { items: batch.len() })
            }
            Err(e) => {
                tracing::warn!(error = %e, items = batch.len(), "Offline queue sync failed");
                self.write_state().last_sync = Some(SyncStatus {
                    timestamp: self.deps.clock.now_millis(),
                    items_synced: 0,
                    duration_ms,
                    success: false,
                    error: Some(e.to_string()),
                });
                self.publish(StoreEvent::SyncFailed {
                    error: e.to_string(),
                });
                Err(StoreError::Sync(e))
            }
        }
    }

    // ============================================
    // Connectivity
    // ============================================

    /// React to an online/offline transition
    ///
    /// Going online reloads (and optionally syncs); going offline only sets
    /// the advisory and keeps all data.
    pub async fn handle_connectivity_change(&self, online: bool) {
        self.publish(StoreEvent::ConnectivityChanged { online });

        if online {
            self.load().await;
            if self.config.auto_sync_on_reconnect {
                if let Err(e) = self.sync_offline_queue().await {
                    tracing::warn!(error = %e, "Automatic sync after reconnect failed");
                }
            }
        } else {
            self.set_error(Some(OFFLINE_PENDING_MESSAGE.to_string()));
        }
    }

    /// Follow the connectivity channel until [`DataStore::shutdown`]
    pub fn watch_connectivity(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.deps.connectivity.subscribe();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *changes.borrow_and_update();
                        self.handle_connectivity_change(online).await;
                    }
                    _ = async {
                    let _ = shutdown.wait_for(|stopped| *stopped).await;
                } => break,
                }
            }
            tracing::debug!("Connectivity watcher stopped");
        })
    }

    /// Stop the connectivity watcher and abandon any in-flight fetch
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
