//! Built-in snapshot used when neither the network nor the cache can supply data

use super::types::*;

impl AppData {
    /// The fixed default snapshot
    pub fn fallback() -> Self {
        Self {
            stats: Stats {
                active_sites: 247,
                anomalies_detected: 8,
                verified_submissions: 1847,
                community_reports: 324,
            },
            monitoring_sites: vec![
                site(1, "Yamuna - Delhi", 28.6139, 77.209, SiteStatus::Normal, 4.2, 6.5, "Delhi"),
                site(2, "Ganga - Varanasi", 25.3176, 82.9739, SiteStatus::Warning, 5.8, 6.0, "Uttar Pradesh"),
                site(3, "Brahmaputra - Guwahati", 26.1445, 91.7362, SiteStatus::Critical, 7.2, 7.0, "Assam"),
                site(4, "Godavari - Nashik", 19.9975, 73.7898, SiteStatus::Normal, 3.1, 5.5, "Maharashtra"),
                site(5, "Krishna - Vijayawada", 16.5062, 80.648, SiteStatus::Warning, 4.9, 5.2, "Andhra Pradesh"),
            ],
            recent_alerts: vec![Alert {
                id: "ALT-2847".to_string(),
                title: "Critical Water Level".to_string(),
                message: "Brahmaputra river exceeded danger mark".to_string(),
                severity: AlertSeverity::Critical,
                location: "Guwahati, Assam".to_string(),
                time: "5 min ago".to_string(),
            }],
            flood_probability: FloodProbability {
                percentage: 42.0,
                trend: "rising".to_string(),
                rainfall_intensity: "moderate".to_string(),
                prediction_24h: "45%".to_string(),
            },
            trust_metrics: TrustMetrics {
                ai_confidence: 87.0,
                blockchain_valid: true,
                drone_verified: false,
            },
            water_level_history: [("00:00", 4.2), ("08:00", 4.8), ("16:00", 5.0), ("24:00", 4.4)]
                .into_iter()
                .map(|(time, level)| WaterLevelReading {
                    time: time.to_string(),
                    level,
                })
                .collect(),
            notifications: vec![Notification {
                id: 1,
                title: "New Alert".to_string(),
                message: "Critical water level at Brahmaputra".to_string(),
                kind: NotificationType::Critical,
                read: false,
                time: "5 min ago".to_string(),
            }],
            offline_queue: Vec::new(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn site(
    id: u32,
    name: &str,
    lat: f64,
    lng: f64,
    status: SiteStatus,
    water_level: f64,
    danger_level: f64,
    state: &str,
) -> MonitoringSite {
    MonitoringSite {
        id,
        name: name.to_string(),
        lat,
        lng,
        status,
        water_level,
        danger_level,
        state: state.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_snapshot() {
        let data = AppData::fallback();
        assert_eq!(data.stats.active_sites, 247);
        assert_eq!(data.monitoring_sites.len(), 5);
        assert_eq!(data.unread_notifications(), 1);
        assert!(data.offline_queue.is_empty());
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_fallback_json_uses_camel_case() {
        let value = serde_json::to_value(AppData::fallback()).unwrap();
        assert_eq!(value["stats"]["activeSites"], 247);
        assert_eq!(value["floodProbability"]["prediction24h"], "45%");
        assert_eq!(value["monitoringSites"][2]["dangerLevel"], 7.0);
        assert!(value["offlineQueue"].as_array().unwrap().is_empty());
    }
}
