//! JalDrishti REST API
//!
//! The field hub the client talks to, built with Axum. It serves the
//! dashboard snapshot and receives offline batches.
//!
//! # Endpoints
//!
//! ## Snapshot
//! - `GET /data.json` - Current dashboard snapshot
//!
//! ## Offline queue
//! - `POST /api/v1/offline-batch` - Submit queued actions
//! - `GET /api/v1/offline-batch` - List received actions
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,no_run
//! use jaldrishti::api::{serve, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let state = AppState::new(AppState::load_snapshot(None)?, config.clone());
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, ReceivedLog, ServerConfig};

use axum::{http::HeaderValue, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().route(
        "/offline-batch",
        get(routes::offline::list_received).post(routes::offline::receive_batch),
    );

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/data.json", get(routes::data::get_snapshot))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
    }
}

/// Start the API server, stopping on Ctrl+C or SIGTERM
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("JalDrishti API listening on {}", addr);

    serve_with_shutdown(state, listener, shutdown_signal()).await?;

    tracing::info!("JalDrishti API shut down gracefully");
    Ok(())
}

/// Serve on an already-bound listener until `shutdown` resolves
pub async fn serve_with_shutdown(
    state: AppState,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ApiError> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Connectivity;
    use crate::fetch::{HttpSnapshotSource, SnapshotSourceConfig};
    use crate::model::{AppData, OfflineQueueItem};
    use crate::storage::MemoryStore;
    use crate::store::{DataOrigin, DataStore, StoreConfig, StoreDeps, SyncOutcome};
    use crate::sync::{HttpBatchSubmitter, SubmitterConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        build_router(AppState::new(AppData::fallback(), ServerConfig::default()))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_batch(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/offline-batch")
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["received_items"], 0);
    }

    #[tokio::test]
    async fn test_snapshot_wire_shape() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/data.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["stats"]["activeSites"], 247);
        assert_eq!(body["notifications"][0]["type"], "critical");
        assert_eq!(body["offlineQueue"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_receive_batch() {
        let app = create_test_app();
        let items = vec![
            OfflineQueueItem::new("gauge-reading", serde_json::json!({"level": 6.4}), 1),
            OfflineQueueItem::new("community-report", serde_json::json!({}), 2),
        ];
        let body = serde_json::json!({ "items": items }).to_string();

        let response = app.clone().oneshot(post_batch(body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["accepted"], 2);

        // Resubmission is acknowledged but stored once
        let response = app.clone().oneshot(post_batch(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/offline-batch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed["count"], 2);
        assert_eq!(listed["items"][0]["type"], "gauge-reading");
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_batch_rejected() {
        let item = OfflineQueueItem::new("gauge-reading", serde_json::json!(1), 1);
        let body = serde_json::json!({ "items": [item.clone(), item] }).to_string();

        let response = create_test_app().oneshot(post_batch(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let response = create_test_app()
            .oneshot(post_batch("not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_client_round_trip_against_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(AppData::fallback(), ServerConfig::default());
        let received = Arc::clone(&state.received);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_with_shutdown(state, listener, async {
            let _ = stop_rx.await;
        }));

        let source = HttpSnapshotSource::new(SnapshotSourceConfig {
            url: format!("http://{}/data.json", addr),
            ..SnapshotSourceConfig::default()
        })
        .unwrap();
        let submitter = HttpBatchSubmitter::new(SubmitterConfig {
            endpoint: format!("http://{}/api/v1/offline-batch", addr),
            ..SubmitterConfig::default()
        })
        .unwrap();
        let store = DataStore::new(
            StoreDeps::new(
                Arc::new(source),
                Arc::new(MemoryStore::new()),
                Arc::new(submitter),
                Connectivity::new(true),
            ),
            StoreConfig::default(),
        );

        assert_eq!(store.load().await.origin, DataOrigin::Network);
        store
            .add_to_offline_queue("gauge-reading", serde_json::json!({"site": 2, "level": 8.9}))
            .unwrap();
        assert_eq!(
            store.sync_offline_queue().await.unwrap(),
            SyncOutcome::Synced { items: 1 }
        );
        assert!(store.offline_queue().is_empty());
        assert_eq!(received.read().await.len(), 1);

        let _ = stop_tx.send(());
        server.await.unwrap().unwrap();
    }
}
