//! Simulated AI gauge confidence

use super::{simulate_latency, CapabilityError, ConfidenceScorer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Confidence reported for a clean capture far from the danger level
pub const BASE_CONFIDENCE: u8 = 87;
/// Readings below this need manual review
pub const LOW_CONFIDENCE: u8 = 70;

/// A captured gauge reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaugeCapture {
    pub site_id: u32,
    pub water_level: f64,
    pub danger_level: f64,
    /// The worker moved the overlay by hand
    #[serde(default)]
    pub manual_adjust: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Confidence {
    /// 0..=100
    pub value: u8,
}

impl Confidence {
    pub fn is_low(&self) -> bool {
        self.value < LOW_CONFIDENCE
    }
}

/// Deterministic scorer
///
/// Captures within 25% of the danger level lose up to 20 points, and manual
/// overlay adjustments lose 5 more.
#[derive(Debug, Default, Clone)]
pub struct SimulatedScorer {
    latency: Duration,
}

impl SimulatedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn compute(capture: &GaugeCapture) -> Result<Confidence, CapabilityError> {
        if !capture.water_level.is_finite() || capture.water_level < 0.0 {
            return Err(CapabilityError::InvalidInput(format!(
                "water level {} is not a valid reading",
                capture.water_level
            )));
        }
        if !capture.danger_level.is_finite() || capture.danger_level <= 0.0 {
            return Err(CapabilityError::InvalidInput(format!(
                "danger level {} must be positive",
                capture.danger_level
            )));
        }

        let distance = (capture.danger_level - capture.water_level).abs() / capture.danger_level;
        let proximity_penalty = ((0.25 - distance).max(0.0) * 80.0).round();
        let manual_penalty = if capture.manual_adjust { 5.0 } else { 0.0 };
        let value = (BASE_CONFIDENCE as f64 - proximity_penalty - manual_penalty).clamp(0.0, 100.0);

        Ok(Confidence { value: value as u8 })
    }
}

#[async_trait]
impl ConfidenceScorer for SimulatedScorer {
    async fn score(&self, capture: &GaugeCapture) -> Result<Confidence, CapabilityError> {
        let confidence = Self::compute(capture)?;
        simulate_latency(self.latency).await;
        tracing::debug!(site = capture.site_id, confidence = confidence.value, "Gauge capture scored");
        Ok(confidence)
    }
}
