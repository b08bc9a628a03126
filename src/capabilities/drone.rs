//! Simulated drone fleet

use super::{simulate_latency, CapabilityError, DroneTelemetry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DroneState {
    InFlight,
    Completed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DroneStatus {
    pub id: String,
    pub state: DroneState,
    pub site: String,
    /// Percent
    pub battery: u8,
    pub eta: Option<String>,
}

/// Fixed fleet table
#[derive(Debug, Clone)]
pub struct SimulatedFleet {
    drones: Vec<DroneStatus>,
    latency: Duration,
}

fn drone(id: &str, state: DroneState, site: &str, battery: u8, eta: Option<&str>) -> DroneStatus {
    DroneStatus {
        id: id.to_string(),
        state,
        site: site.to_string(),
        battery,
        eta: eta.map(str::to_string),
    }
}

impl Default for SimulatedFleet {
    fn default() -> Self {
        Self {
            drones: vec![
                drone("DRN-001", DroneState::InFlight, "Brahmaputra - Guwahati", 78, Some("12 min")),
                drone("DRN-002", DroneState::Completed, "Ganga - Varanasi", 45, None),
                drone("DRN-003", DroneState::Pending, "Krishna - Vijayawada", 100, Some("Queue: 2")),
                drone("DRN-004", DroneState::InFlight, "Godavari - Nashik", 62, Some("8 min")),
            ],
            latency: Duration::ZERO,
        }
    }
}

impl SimulatedFleet {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fleet(&self) -> &[DroneStatus] {
        &self.drones
    }

    pub fn in_flight(&self) -> usize {
        self.drones
            .iter()
            .filter(|d| d.state == DroneState::InFlight)
            .count()
    }
}

#[async_trait]
impl DroneTelemetry for SimulatedFleet {
    async fn status(&self, drone_id: &str) -> Result<DroneStatus, CapabilityError> {
        simulate_latency(self.latency).await;
        self.drones
            .iter()
            .find(|d| d.id.eq_ignore_ascii_case(drone_id))
            .cloned()
            .ok_or_else(|| CapabilityError::NotFound(format!("drone {}", drone_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let fleet = SimulatedFleet::default();
        let status = fleet.status("drn-001").await.unwrap();
        assert_eq!(status.state, DroneState::InFlight);
        assert_eq!(status.battery, 78);
        assert_eq!(fleet.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_unknown_drone() {
        let fleet = SimulatedFleet::default();
        assert!(matches!(
            fleet.status("DRN-999").await,
            Err(CapabilityError::NotFound(_))
        ));
    }

    #[test]
    fn test_state_wire_name() {
        assert_eq!(
            serde_json::to_value(DroneState::InFlight).unwrap(),
            serde_json::json!("in-flight")
        );
    }
}
