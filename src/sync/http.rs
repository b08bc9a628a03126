//! HTTP batch submitter

use super::{BatchReceipt, BatchRequest, BatchSubmitter, SubmitError};
use crate::model::OfflineQueueItem;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Configuration for the HTTP submitter
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Endpoint accepting `{ "items": [...] }`
    pub endpoint: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum attempts per batch (1 disables retries)
    pub max_retries: u32,
    /// Base delay for quadratic backoff between attempts
    pub backoff_base_ms: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8090/api/v1/offline-batch".to_string(),
            request_timeout_ms: 5000,
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }
}

/// POSTs queued actions to the remote endpoint
pub struct HttpBatchSubmitter {
    client: Client,
    config: SubmitterConfig,
}

impl HttpBatchSubmitter {
    pub fn new(config: SubmitterConfig) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Longest server-requested pause honoured between attempts
    fn retry_after_cap(&self) -> Duration {
        let attempts = u64::from(self.config.max_retries.max(1));
        Duration::from_millis(self.config.request_timeout_ms.saturating_mul(attempts))
    }

    fn map_request_error(e: reqwest::Error) -> SubmitError {
        if e.is_timeout() {
            SubmitError::Timeout
        } else if e.is_connect() {
            SubmitError::Unavailable
        } else {
            SubmitError::Request(e)
        }
    }
}

#[async_trait]
impl BatchSubmitter for HttpBatchSubmitter {
    async fn submit(&self, items: &[OfflineQueueItem]) -> Result<BatchReceipt, SubmitError> {
        let body = BatchRequest {
            items: items.to_vec(),
        };
        let attempts = self.config.max_retries.max(1);
        let mut last_error = SubmitError::Unavailable;
        let mut retry_after: Option<Duration> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Quadratic backoff: base, 4*base, 9*base...
                let factor = u64::from(attempt).saturating_mul(u64::from(attempt));
                let backoff = Duration::from_millis(self.config.backoff_base_ms.saturating_mul(factor));
                let delay = match retry_after.take() {
                    Some(requested) => backoff.max(requested.min(self.retry_after_cap())),
                    None => backoff,
                };
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying batch submit");
                tokio::time::sleep(delay).await;
            }

            match self
                .client
                .post(&self.config.endpoint)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let receipt = response.json::<BatchReceipt>().await.unwrap_or(BatchReceipt {
                            accepted: items.len(),
                        });
                        if receipt.accepted != items.len() {
                            return Err(SubmitError::Rejected(format!(
                                "endpoint accepted {} of {} items",
                                receipt.accepted,
                                items.len()
                            )));
                        }
                        return Ok(receipt);
                    } else if status.as_u16() == 429 {
                        retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs);
                        last_error = SubmitError::RateLimited;
                        continue;
                    } else if status.is_server_error() {
                        let text = response.text().await.unwrap_or_default();
                        last_error = SubmitError::ApiError {
                            status: status.as_u16(),
                            message: text,
                        };
                        continue;
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        return Err(SubmitError::ApiError {
                            status: status.as_u16(),
                            message: text,
                        });
                    }
                }
                Err(e) => {
                    last_error = Self::map_request_error(e);
                    continue;
                }
            }
        }

        tracing::warn!(attempts, error = %last_error, "Batch submit gave up");
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config_for(endpoint: String) -> SubmitterConfig {
        SubmitterConfig {
            endpoint,
            request_timeout_ms: 2000,
            max_retries: 3,
            backoff_base_ms: 10,
        }
    }

    fn items() -> Vec<OfflineQueueItem> {
        vec![
            OfflineQueueItem::new("gauge-reading", serde_json::json!({"level": 5.2}), 1),
            OfflineQueueItem::new("gauge-reading", serde_json::json!({"level": 5.4}), 2),
        ]
    }

    #[test]
    fn test_default_config() {
        let config = SubmitterConfig::default();
        assert_eq!(config.max_retries, 3);
        assert!(config.endpoint.ends_with("/api/v1/offline-batch"));
    }

    #[tokio::test]
    async fn test_submit_success() {
        let router = Router::new().route(
            "/batch",
            post(|Json(body): Json<BatchRequest>| async move {
                Json(BatchReceipt {
                    accepted: body.items.len(),
                })
            }),
        );
        let base = spawn_server(router).await;
        let submitter = HttpBatchSubmitter::new(config_for(format!("{}/batch", base))).unwrap();

        let receipt = submitter.submit(&items()).await.unwrap();
        assert_eq!(receipt.accepted, 2);
    }

    #[tokio::test]
    async fn test_submit_retries_server_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let router = Router::new().route(
            "/batch",
            post(move |Json(body): Json<BatchRequest>| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StatusCode::SERVICE_UNAVAILABLE)
                    } else {
                        Ok(Json(BatchReceipt {
                            accepted: body.items.len(),
                        }))
                    }
                }
            }),
        );
        let base = spawn_server(router).await;
        let submitter = HttpBatchSubmitter::new(config_for(format!("{}/batch", base))).unwrap();

        let receipt = submitter.submit(&items()).await.unwrap();
        assert_eq!(receipt.accepted, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_submit_client_error_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let router = Router::new().route(
            "/batch",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::BAD_REQUEST, "bad batch")
                }
            }),
        );
        let base = spawn_server(router).await;
        let submitter = HttpBatchSubmitter::new(config_for(format!("{}/batch", base))).unwrap();

        let err = submitter.submit(&items()).await.unwrap_err();
        assert!(matches!(err, SubmitError::ApiError { status: 400, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn rate_limited_then_ok(calls: Arc<AtomicUsize>, limited: usize) -> Router {
        Router::new().route(
            "/batch",
            post(move |Json(body): Json<BatchRequest>| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < limited {
                        Err((StatusCode::TOO_MANY_REQUESTS, [("Retry-After", "3600")]))
                    } else {
                        Ok(Json(BatchReceipt {
                            accepted: body.items.len(),
                        }))
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_retry_after_is_capped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(rate_limited_then_ok(Arc::clone(&calls), 1)).await;
        let submitter = HttpBatchSubmitter::new(SubmitterConfig {
            request_timeout_ms: 100,
            ..config_for(format!("{}/batch", base))
        })
        .unwrap();
        assert_eq!(submitter.retry_after_cap(), Duration::from_millis(300));

        let receipt = tokio::time::timeout(Duration::from_secs(5), submitter.submit(&items()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.accepted, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_wait_after_final_rate_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(rate_limited_then_ok(Arc::clone(&calls), usize::MAX)).await;
        let submitter = HttpBatchSubmitter::new(SubmitterConfig {
            max_retries: 1,
            ..config_for(format!("{}/batch", base))
        })
        .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(1), submitter.submit(&items()))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, SubmitError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_partial_acceptance_is_rejected() {
        let router = Router::new().route(
            "/batch",
            post(|| async { Json(BatchReceipt { accepted: 1 }) }),
        );
        let base = spawn_server(router).await;
        let submitter = HttpBatchSubmitter::new(config_for(format!("{}/batch", base))).unwrap();

        let err = submitter.submit(&items()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(_)));
    }
}
