//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `JALDRISHTI_*` environment variable overrides.

use crate::fetch::SnapshotSourceConfig;
use crate::safety::MonitorConfig;
use crate::store::StoreConfig;
use crate::sync::SubmitterConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("jaldrishti").to_string_lossy().to_string())
        .unwrap_or_else(|| "./jaldrishti_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Data directory with a leading `~/` expanded
    pub fn data_path(&self) -> PathBuf {
        match (self.data_dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.data_dir),
        }
    }
}

/// Snapshot fetch and connectivity probe
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_url")]
    pub url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Health URL polled to decide online/offline; no probe when unset
    pub probe_url: Option<String>,

    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

fn default_fetch_url() -> String {
    "http://localhost:8090/data.json".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_probe_interval() -> u64 {
    15
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: default_fetch_url(),
            timeout_ms: default_timeout_ms(),
            probe_url: None,
            probe_interval_secs: default_probe_interval(),
        }
    }
}

/// Offline queue submission
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub auto_sync_on_reconnect: bool,
}

fn default_sync_endpoint() -> String {
    "http://localhost:8090/api/v1/offline-batch".to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sync_endpoint(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            auto_sync_on_reconnect: false,
        }
    }
}

/// Dead-man switch and fall detection timings
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_check_in_minutes")]
    pub check_in_minutes: u64,

    #[serde(default = "default_warning_minutes")]
    pub warning_minutes: u64,

    #[serde(default = "default_fall_countdown")]
    pub fall_countdown_secs: u64,

    #[serde(default = "default_location")]
    pub last_known_location: String,
}

fn default_check_in_minutes() -> u64 {
    30
}

fn default_warning_minutes() -> u64 {
    5
}

fn default_fall_countdown() -> u64 {
    60
}

fn default_location() -> String {
    crate::safety::DEFAULT_LOCATION.to_string()
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            check_in_minutes: default_check_in_minutes(),
            warning_minutes: default_warning_minutes(),
            fall_countdown_secs: default_fall_countdown(),
            last_known_location: default_location(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// JSON snapshot served at `/data.json`; the built-in snapshot when unset
    pub snapshot_file: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            snapshot_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Install the global subscriber; `RUST_LOG` wins over the configured level
    pub fn init(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("jaldrishti={},tower_http=info", self.level))
        });
        let registry = tracing_subscriber::registry().with(filter);

        let result = if self.is_json() {
            registry.with(tracing_subscriber::fmt::layer().json()).try_init()
        } else {
            registry.with(tracing_subscriber::fmt::layer()).try_init()
        };
        if let Err(e) = result {
            eprintln!("Logging already initialised: {}", e);
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("jaldrishti").join("config.toml")),
            Some(PathBuf::from("/etc/jaldrishti/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `JALDRISHTI_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = lookup("JALDRISHTI_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Some(url) = lookup("JALDRISHTI_FETCH_URL") {
            self.fetch.url = url;
        }
        if let Some(url) = lookup("JALDRISHTI_PROBE_URL") {
            self.fetch.probe_url = Some(url);
        }

        if let Some(endpoint) = lookup("JALDRISHTI_SYNC_ENDPOINT") {
            self.sync.endpoint = endpoint;
        }
        if let Some(flag) = lookup("JALDRISHTI_AUTO_SYNC") {
            if let Ok(v) = flag.parse() {
                self.sync.auto_sync_on_reconnect = v;
            }
        }

        if let Some(location) = lookup("JALDRISHTI_LOCATION") {
            self.safety.last_known_location = location;
        }

        if let Some(host) = lookup("JALDRISHTI_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("JALDRISHTI_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Some(file) = lookup("JALDRISHTI_SNAPSHOT_FILE") {
            self.api.snapshot_file = Some(file);
        }

        if let Some(level) = lookup("JALDRISHTI_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("JALDRISHTI_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn snapshot_source(&self) -> SnapshotSourceConfig {
        SnapshotSourceConfig {
            url: self.fetch.url.clone(),
            request_timeout_ms: self.fetch.timeout_ms,
        }
    }

    pub fn submitter(&self) -> SubmitterConfig {
        SubmitterConfig {
            endpoint: self.sync.endpoint.clone(),
            request_timeout_ms: self.sync.timeout_ms,
            max_retries: self.sync.max_retries,
            ..SubmitterConfig::default()
        }
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            fetch_timeout: Duration::from_millis(self.fetch.timeout_ms),
            auto_sync_on_reconnect: self.sync.auto_sync_on_reconnect,
            ..StoreConfig::default()
        }
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            check_in_interval: Duration::from_secs(self.safety.check_in_minutes.saturating_mul(60)),
            warning_window: Duration::from_secs(self.safety.warning_minutes.saturating_mul(60)),
            fall_countdown: Duration::from_secs(self.safety.fall_countdown_secs),
            last_known_location: self.safety.last_known_location.clone(),
            ..MonitorConfig::default()
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# JalDrishti Configuration
#
# Environment variables override these settings:
# - JALDRISHTI_DATA_DIR
# - JALDRISHTI_FETCH_URL
# - JALDRISHTI_PROBE_URL
# - JALDRISHTI_SYNC_ENDPOINT
# - JALDRISHTI_AUTO_SYNC
# - JALDRISHTI_LOCATION
# - JALDRISHTI_API_HOST
# - JALDRISHTI_API_PORT
# - JALDRISHTI_SNAPSHOT_FILE
# - JALDRISHTI_LOG_LEVEL
# - JALDRISHTI_LOG_FORMAT

[storage]
# Directory for the local key-value store (cache, offline queue, preferences)
data_dir = "~/.local/share/jaldrishti"

[fetch]
# Dashboard snapshot resource
url = "http://localhost:8090/data.json"

# Give up on the snapshot fetch after this long (ms)
timeout_ms = 5000

# Optional health URL polled to detect connectivity
# probe_url = "http://localhost:8090/health"
probe_interval_secs = 15

[sync]
# Where queued offline actions are submitted
endpoint = "http://localhost:8090/api/v1/offline-batch"
timeout_ms = 5000

# Attempts per sync before giving up
max_retries = 3

# Submit the queue right after connectivity returns
auto_sync_on_reconnect = false

[safety]
# Dead-man switch check-in interval
check_in_minutes = 30

# Warn this long before the switch fires
warning_minutes = 5

# Time to dismiss a detected fall before SOS
fall_countdown_secs = 60

last_known_location = "last known GPS fix"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins
cors_origins = ["http://localhost:8080", "http://127.0.0.1:8080"]

# Serve this JSON file at /data.json instead of the built-in snapshot
# snapshot_file = "./data.json"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
