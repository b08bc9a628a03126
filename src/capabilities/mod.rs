//! External Capabilities
//!
//! The dashboard talks to three outside systems that are simulated here behind
//! single-method traits, so real backends can be slotted in later:
//!
//! - [`EvidenceLedger`]: tamper-evident record of gauge readings
//! - [`ConfidenceScorer`]: AI confidence for a captured gauge image
//! - [`DroneTelemetry`]: status of verification drones

mod drone;
mod ledger;
mod scorer;

pub use drone::{DroneState, DroneStatus, SimulatedFleet};
pub use ledger::{Evidence, LedgerReceipt, LedgerStatus, SimulatedLedger};
pub use scorer::{Confidence, GaugeCapture, SimulatedScorer, BASE_CONFIDENCE, LOW_CONFIDENCE};

use async_trait::async_trait;

/// Records evidence and returns its receipt
#[async_trait]
pub trait EvidenceLedger: Send + Sync {
    async fn submit(&self, evidence: &Evidence) -> Result<LedgerReceipt, CapabilityError>;
}

/// Scores a gauge capture
#[async_trait]
pub trait ConfidenceScorer: Send + Sync {
    async fn score(&self, capture: &GaugeCapture) -> Result<Confidence, CapabilityError>;
}

/// Looks up a drone
#[async_trait]
pub trait DroneTelemetry: Send + Sync {
    async fn status(&self, drone_id: &str) -> Result<DroneStatus, CapabilityError>;
}

/// Errors that can occur when calling a capability
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

/// Fake round-trip delay applied by the simulated implementations
async fn simulate_latency(latency: std::time::Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
