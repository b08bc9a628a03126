//! Dashboard data types
//!
//! The shapes mirror the JSON resource the dashboard bootstraps from, so field
//! names are serialized in camelCase.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Complete dashboard snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub stats: Stats,
    pub monitoring_sites: Vec<MonitoringSite>,
    pub recent_alerts: Vec<Alert>,
    pub flood_probability: FloodProbability,
    pub trust_metrics: TrustMetrics,
    pub water_level_history: Vec<WaterLevelReading>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub offline_queue: Vec<OfflineQueueItem>,
}

/// Headline counters shown on the dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub active_sites: u64,
    pub anomalies_detected: u64,
    pub verified_submissions: u64,
    pub community_reports: u64,
}

/// Names a single field of [`Stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKey {
    ActiveSites,
    AnomaliesDetected,
    VerifiedSubmissions,
    CommunityReports,
}

impl StatKey {
    pub const ALL: [StatKey; 4] = [
        StatKey::ActiveSites,
        StatKey::AnomaliesDetected,
        StatKey::VerifiedSubmissions,
        StatKey::CommunityReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::ActiveSites => "activeSites",
            StatKey::AnomaliesDetected => "anomaliesDetected",
            StatKey::VerifiedSubmissions => "verifiedSubmissions",
            StatKey::CommunityReports => "communityReports",
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownValue {
                field: "stat key",
                value: s.to_string(),
            })
    }
}

impl Stats {
    pub fn get(&self, key: StatKey) -> u64 {
        match key {
            StatKey::ActiveSites => self.active_sites,
            StatKey::AnomaliesDetected => self.anomalies_detected,
            StatKey::VerifiedSubmissions => self.verified_submissions,
            StatKey::CommunityReports => self.community_reports,
        }
    }

    /// Returns a copy with one field replaced
    pub fn with(mut self, key: StatKey, value: u64) -> Self {
        match key {
            StatKey::ActiveSites => self.active_sites = value,
            StatKey::AnomaliesDetected => self.anomalies_detected = value,
            StatKey::VerifiedSubmissions => self.verified_submissions = value,
            StatKey::CommunityReports => self.community_reports = value,
        }
        self
    }
}

/// A river gauge location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSite {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub status: SiteStatus,
    /// Current level in metres
    pub water_level: f64,
    /// Danger mark in metres
    pub danger_level: f64,
    /// Region name
    pub state: String,
}

impl MonitoringSite {
    /// Water level as a fraction of the danger mark
    pub fn level_ratio(&self) -> Option<f64> {
        if self.danger_level > 0.0 {
            Some(self.water_level / self.danger_level)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteStatus::Normal => "normal",
            SiteStatus::Warning => "warning",
            SiteStatus::Critical => "critical",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub location: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: u32,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub read: bool,
    /// Display string such as "5 min ago"
    pub time: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Critical,
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloodProbability {
    pub percentage: f64,
    pub trend: String,
    pub rainfall_intensity: String,
    #[serde(rename = "prediction24h")]
    pub prediction_24h: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrustMetrics {
    pub ai_confidence: f64,
    pub blockchain_valid: bool,
    pub drone_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterLevelReading {
    pub time: String,
    pub level: f64,
}

/// A write action deferred while offline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineQueueItem {
    pub id: String,
    /// Free-form action tag, e.g. "gauge-reading"
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// Creation time, Unix milliseconds
    pub timestamp: i64,
}

impl OfflineQueueItem {
    /// Build an item with a time-based id
    pub fn new(kind: impl Into<String>, data: serde_json::Value, timestamp: i64) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("offline-{}-{}", timestamp, &suffix[..8]),
            kind: kind.into(),
            data,
            timestamp,
        }
    }
}

/// Structural problems in a decoded snapshot
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("site {id} has invalid {field}: {value}")]
    InvalidSiteValue {
        id: u32,
        field: &'static str,
        value: f64,
    },

    #[error("unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
}

impl AppData {
    /// Number of notifications not yet acknowledged
    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn sites_by_status(&self, status: SiteStatus) -> impl Iterator<Item = &MonitoringSite> {
        self.monitoring_sites
            .iter()
            .filter(move |site| site.status == status)
    }

    pub fn site(&self, id: u32) -> Option<&MonitoringSite> {
        self.monitoring_sites.iter().find(|site| site.id == id)
    }

    /// Check the invariants a cached or fetched snapshot must satisfy
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut site_ids = HashSet::new();
        for site in &self.monitoring_sites {
            if !site_ids.insert(site.id) {
                return Err(ValidationError::DuplicateId {
                    kind: "site",
                    id: site.id.to_string(),
                });
            }
            check_range(site.id, "lat", site.lat, -90.0, 90.0)?;
            check_range(site.id, "lng", site.lng, -180.0, 180.0)?;
            check_range(site.id, "waterLevel", site.water_level, f64::MIN, f64::MAX)?;
            check_range(site.id, "dangerLevel", site.danger_level, f64::MIN, f64::MAX)?;
        }

        let mut notification_ids = HashSet::new();
        for notification in &self.notifications {
            if !notification_ids.insert(notification.id) {
                return Err(ValidationError::DuplicateId {
                    kind: "notification",
                    id: notification.id.to_string(),
                });
            }
        }

        let mut queue_ids = HashSet::new();
        for item in &self.offline_queue {
            if !queue_ids.insert(item.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    kind: "offline queue item",
                    id: item.id.clone(),
                });
            }
        }

        Ok(())
    }
}

fn check_range(
    id: u32,
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::InvalidSiteValue { id, field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_shape() {
        let json = r#"{"id":3,"title":"t","message":"m","type":"success","read":false,"time":"now"}"#;
        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.kind, NotificationType::Success);

        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "success");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_stat_key_parse() {
        assert_eq!("activeSites".parse::<StatKey>().unwrap(), StatKey::ActiveSites);
        assert!("active_sites".parse::<StatKey>().is_err());
    }

    #[test]
    fn test_stats_with_replaces_single_field() {
        let stats = AppData::fallback().stats;
        let updated = stats.with(StatKey::CommunityReports, 400);
        assert_eq!(updated.community_reports, 400);
        assert_eq!(updated.active_sites, stats.active_sites);
        assert_eq!(updated.get(StatKey::CommunityReports), 400);
    }

    #[test]
    fn test_queue_item_ids_are_distinct_within_a_millisecond() {
        let a = OfflineQueueItem::new("reading", serde_json::json!({}), 1_000);
        let b = OfflineQueueItem::new("reading", serde_json::json!({}), 1_000);
        assert!(a.id.starts_with("offline-1000-"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_validate_rejects_duplicate_site() {
        let mut data = AppData::fallback();
        let dup = data.monitoring_sites[0].clone();
        data.monitoring_sites.push(dup);
        assert!(matches!(
            data.validate(),
            Err(ValidationError::DuplicateId { kind: "site", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_coordinates() {
        let mut data = AppData::fallback();
        data.monitoring_sites[1].lat = 123.0;
        assert!(matches!(
            data.validate(),
            Err(ValidationError::InvalidSiteValue { field: "lat", .. })
        ));

        let mut data = AppData::fallback();
        data.monitoring_sites[0].water_level = f64::NAN;
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_level_ratio() {
        let data = AppData::fallback();
        let guwahati = data.site(3).unwrap();
        assert!(guwahati.level_ratio().unwrap() > 1.0);
        assert_eq!(data.sites_by_status(SiteStatus::Warning).count(), 2);
    }
}
