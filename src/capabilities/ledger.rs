//! Simulated evidence ledger

use super::{simulate_latency, CapabilityError, EvidenceLedger};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A gauge reading submitted for recording
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub site_id: String,
    pub user_id: String,
    /// Metres
    pub water_level: f64,
    /// Unix ms
    pub captured_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Verified,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub record_id: String,
    pub hash: String,
    pub status: LedgerStatus,
}

/// In-memory ledger producing deterministic fake hashes
pub struct SimulatedLedger {
    next_seq: AtomicU64,
    latency: Duration,
    records: Mutex<Vec<(Evidence, LedgerReceipt)>>,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(848)
    }
}

impl SimulatedLedger {
    pub fn new(first_seq: u64) -> Self {
        Self {
            next_seq: AtomicU64::new(first_seq),
            latency: Duration::ZERO,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn records(&self) -> Vec<(Evidence, LedgerReceipt)> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// `0x` followed by 40 hex digits derived from the evidence payload
    pub fn fake_hash(payload: &[u8]) -> String {
        let mut hash = String::from("0x");
        for lane in 0u8..5 {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&[lane]);
            hasher.update(payload);
            hash.push_str(&format!("{:08x}", hasher.finalize()));
        }
        hash
    }
}

#[async_trait]
impl EvidenceLedger for SimulatedLedger {
    async fn submit(&self, evidence: &Evidence) -> Result<LedgerReceipt, CapabilityError> {
        if evidence.site_id.trim().is_empty() {
            return Err(CapabilityError::InvalidInput("site id is empty".to_string()));
        }
        if !evidence.water_level.is_finite() || evidence.water_level < 0.0 {
            return Err(CapabilityError::InvalidInput(format!(
                "water level {} is not a valid reading",
                evidence.water_level
            )));
        }
        let captured = DateTime::<Utc>::from_timestamp_millis(evidence.captured_at).ok_or_else(|| {
            CapabilityError::InvalidInput(format!("timestamp {} out of range", evidence.captured_at))
        })?;

        simulate_latency(self.latency).await;

        let payload = serde_json::to_vec(evidence)
            .map_err(|e| CapabilityError::InvalidInput(e.to_string()))?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let receipt = LedgerReceipt {
            record_id: format!("REC-{}-{:05}", captured.year(), seq),
            hash: Self::fake_hash(&payload),
            status: LedgerStatus::Verified,
        };

        tracing::info!(record_id = %receipt.record_id, site = %evidence.site_id, "Evidence recorded");
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((evidence.clone(), receipt.clone()));
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence() -> Evidence {
        Evidence {
            site_id: "YAM-DEL-001".to_string(),
            user_id: "FW-2847".to_string(),
            water_level: 5.2,
            captured_at: 1_705_329_125_000,
        }
    }

    #[tokio::test]
    async fn test_receipts_are_sequential() {
        let ledger = SimulatedLedger::default();
        let first = ledger.submit(&evidence()).await.unwrap();
        let second = ledger.submit(&evidence()).await.unwrap();

        assert_eq!(first.record_id, "REC-2024-00848");
        assert_eq!(second.record_id, "REC-2024-00849");
        assert_eq!(first.status, LedgerStatus::Verified);
        assert_eq!(ledger.records().len(), 2);
    }

    #[tokio::test]
    async fn test_hash_is_deterministic_per_payload() {
        let ledger = SimulatedLedger::default();
        let a = ledger.submit(&evidence()).await.unwrap();
        let b = ledger.submit(&evidence()).await.unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 42);
        assert!(a.hash.starts_with("0x"));
        assert!(a.hash[2..].chars().all(|c| c.is_ascii_hexdigit()));

        let mut other = evidence();
        other.water_level = 5.3;
        let c = ledger.submit(&other).await.unwrap();
        assert_ne!(a.hash, c.hash);
    }

    #[tokio::test]
    async fn test_rejects_bad_readings() {
        let ledger = SimulatedLedger::default();
        let mut bad = evidence();
        bad.water_level = f64::NAN;
        assert!(matches!(
            ledger.submit(&bad).await,
            Err(CapabilityError::InvalidInput(_))
        ));

        let mut bad = evidence();
        bad.site_id = " ".to_string();
        assert!(ledger.submit(&bad).await.is_err());
        assert!(ledger.records().is_empty());
    }
}
