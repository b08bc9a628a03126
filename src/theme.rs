//! Theme and danger-zone preferences
//!
//! The two preferences live in local storage under their own keys and are
//! published on a watch channel so the safety monitor (and any renderer) can
//! follow them. Persistence is best-effort: a failed write is logged and the
//! in-memory state still changes.

use crate::storage::{KeyValueStore, DANGER_ZONE_KEY, THEME_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

/// Class added to the document root while danger-zone mode is on
pub const DANGER_ZONE_CLASS: &str = "danger-zone";

/// Visual theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    /// High-contrast outdoor theme
    Boost,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::Boost];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Boost => "boost",
        }
    }

    /// Next theme in toggle order: dark, light, boost
    pub fn next(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Boost,
            Theme::Boost => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "boost" => Ok(Theme::Boost),
            other => Err(ThemeError::InvalidArgument(other.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThemeError {
    #[error("Invalid theme '{0}' (expected light, dark or boost)")]
    InvalidArgument(String),
}

/// Current presentation preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeState {
    pub theme: Theme,
    pub is_danger_zone: bool,
}

impl ThemeState {
    /// Class list for the document root
    pub fn root_classes(&self) -> Vec<&'static str> {
        let mut classes = vec![self.theme.as_str()];
        if self.is_danger_zone {
            classes.push(DANGER_ZONE_CLASS);
        }
        classes
    }
}

/// Receives the presentation attributes after every change
pub trait RootAttributes: Send + Sync {
    fn apply(&self, state: &ThemeState);
}

/// Keeps the last applied class list
#[derive(Debug, Default)]
pub struct RecordingRoot {
    classes: Mutex<Vec<&'static str>>,
}

impl RecordingRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> Vec<&'static str> {
        self.classes
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl RootAttributes for RecordingRoot {
    fn apply(&self, state: &ThemeState) {
        let mut classes = self.classes.lock().unwrap_or_else(|e| e.into_inner());
        *classes = state.root_classes();
    }
}

/// Owner of the theme and danger-zone preferences
pub struct ThemeStore {
    storage: Arc<dyn KeyValueStore>,
    state: watch::Sender<ThemeState>,
    root: Option<Arc<dyn RootAttributes>>,
    write_lock: Mutex<()>,
}

impl ThemeStore {
    /// Read persisted preferences; missing or unrecognised values use the defaults
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(read_persisted(storage.as_ref()));

        Self {
            storage,
            state,
            root: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a presentation sink; it is applied immediately
    pub fn with_root(mut self, root: Arc<dyn RootAttributes>) -> Self {
        root.apply(&self.state());
        self.root = Some(root);
        self
    }

    pub fn state(&self) -> ThemeState {
        *self.state.borrow()
    }

    pub fn theme(&self) -> Theme {
        self.state().theme
    }

    pub fn is_danger_zone(&self) -> bool {
        self.state().is_danger_zone
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeState> {
        self.state.subscribe()
    }

    pub fn set_theme(&self, theme: Theme) -> ThemeState {
        self.update(|state| state.theme = theme)
    }

    /// Set the theme from its string form
    pub fn set_theme_str(&self, value: &str) -> Result<ThemeState, ThemeError> {
        let theme = value.parse()?;
        Ok(self.set_theme(theme))
    }

    pub fn cycle_theme(&self) -> ThemeState {
        self.update(|state| state.theme = state.theme.next())
    }

    pub fn set_danger_zone(&self, active: bool) -> ThemeState {
        self.update(|state| state.is_danger_zone = active)
    }

    pub fn toggle_danger_zone(&self) -> ThemeState {
        self.update(|state| state.is_danger_zone = !state.is_danger_zone)
    }

    /// Pick up preferences written to storage by another process
    ///
    /// Subscribers are notified only when the persisted state differs.
    pub fn reload(&self) -> ThemeState {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let next = read_persisted(self.storage.as_ref());
        if self.publish(next) {
            tracing::debug!(theme = %next.theme, danger_zone = next.is_danger_zone, "Theme reloaded");
        }
        next
    }

    fn update(&self, change: impl FnOnce(&mut ThemeState)) -> ThemeState {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut next = self.state();
        change(&mut next);

        self.persist(&next);
        self.publish(next);

        tracing::debug!(theme = %next.theme, danger_zone = next.is_danger_zone, "Theme updated");
        next
    }

    fn publish(&self, next: ThemeState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if let Some(root) = &self.root {
            root.apply(&next);
        }
        changed
    }

    fn persist(&self, state: &ThemeState) {
        if let Err(e) = self.storage.set(THEME_KEY, state.theme.as_str()) {
            tracing::warn!(error = %e, "Failed to persist theme");
        }
        let flag = if state.is_danger_zone { "true" } else { "false" };
        if let Err(e) = self.storage.set(DANGER_ZONE_KEY, flag) {
            tracing::warn!(error = %e, "Failed to persist danger-zone flag");
        }
    }
}

fn read_persisted(storage: &dyn KeyValueStore) -> ThemeState {
    let theme = match storage.get(THEME_KEY) {
        Ok(Some(value)) => value.parse::<Theme>().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring persisted theme");
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read theme");
            Theme::default()
        }
    };

    let is_danger_zone = match storage.get(DANGER_ZONE_KEY) {
        Ok(Some(value)) => value == "true",
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read danger-zone flag");
            false
        }
    };

    ThemeState {
        theme,
        is_danger_zone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_nothing_persisted() {
        let store = ThemeStore::load(Arc::new(MemoryStore::new()));
        assert_eq!(
            store.state(),
            ThemeState {
                theme: Theme::Dark,
                is_danger_zone: false
            }
        );
    }

    #[test]
    fn test_theme_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(temp_dir.path()).unwrap());

        let store = ThemeStore::load(Arc::clone(&storage));
        store.set_theme(Theme::Boost);
        store.set_danger_zone(true);
        drop(store);

        let reopened = ThemeStore::load(Arc::new(FileStore::open(temp_dir.path()).unwrap()));
        assert_eq!(reopened.theme(), Theme::Boost);
        assert!(reopened.is_danger_zone());
    }

    #[test]
    fn test_unrecognised_persisted_values_use_defaults() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(THEME_KEY, "sepia").unwrap();
        storage.set(DANGER_ZONE_KEY, "yes").unwrap();

        let store = ThemeStore::load(storage);
        assert_eq!(store.theme(), Theme::Dark);
        assert!(!store.is_danger_zone());
    }

    #[test]
    fn test_set_theme_str_rejects_unknown() {
        let store = ThemeStore::load(Arc::new(MemoryStore::new()));
        let err = store.set_theme_str("neon").unwrap_err();
        assert_eq!(err, ThemeError::InvalidArgument("neon".to_string()));
        assert_eq!(store.theme(), Theme::Dark);

        assert_eq!(store.set_theme_str("light").unwrap().theme, Theme::Light);
    }

    #[test]
    fn test_cycle_order() {
        let store = ThemeStore::load(Arc::new(MemoryStore::new()));
        let seen: Vec<Theme> = (0..4).map(|_| store.cycle_theme().theme).collect();
        assert_eq!(seen, vec![Theme::Light, Theme::Boost, Theme::Dark, Theme::Light]);
    }

    #[test]
    fn test_root_classes_follow_state() {
        let root = Arc::new(RecordingRoot::new());
        let store = ThemeStore::load(Arc::new(MemoryStore::new())).with_root(root.clone());
        assert_eq!(root.classes(), vec!["dark"]);

        store.toggle_danger_zone();
        assert_eq!(root.classes(), vec!["dark", "danger-zone"]);

        store.set_theme(Theme::Boost);
        store.toggle_danger_zone();
        assert_eq!(root.classes(), vec!["boost"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_danger_zone_changes() {
        let store = ThemeStore::load(Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();

        store.set_danger_zone(true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_danger_zone);

        // Same value, no wakeup
        store.set_danger_zone(true);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_reload_sees_other_writers() {
        let temp_dir = TempDir::new().unwrap();
        let running = ThemeStore::load(Arc::new(FileStore::open(temp_dir.path()).unwrap()));
        let mut rx = running.subscribe();

        let other = ThemeStore::load(Arc::new(FileStore::open(temp_dir.path()).unwrap()));
        other.set_danger_zone(true);
        assert!(!running.is_danger_zone());

        assert!(running.reload().is_danger_zone);
        assert!(running.is_danger_zone());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_danger_zone);

        // Nothing new on disk
        running.reload();
        assert!(!rx.has_changed().unwrap());

        other.set_danger_zone(false);
        assert!(!running.reload().is_danger_zone);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_state_wire_shape() {
        let state = ThemeState {
            theme: Theme::Boost,
            is_danger_zone: true,
        };
        let value = serde_json::to_value(state).unwrap();
        assert_eq!(value, serde_json::json!({"theme": "boost", "isDangerZone": true}));
    }
}
