//! JalDrishti API Server
//!
//! Run with: cargo run --bin jaldrishti-api
//!
//! Serves the dashboard snapshot and receives offline batches from field
//! clients. Reads the `[api]` and `[logging]` sections of the configuration
//! (see `jaldrishti config`); `JALDRISHTI_API_HOST`, `JALDRISHTI_API_PORT`,
//! `JALDRISHTI_SNAPSHOT_FILE` and `RUST_LOG` override them.

use jaldrishti::api::{serve, AppState, ServerConfig};
use jaldrishti::config::Config;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    config.logging.init();

    tracing::info!("Starting JalDrishti API server v{}", env!("CARGO_PKG_VERSION"));

    let snapshot_path = config.api.snapshot_file.as_ref().map(PathBuf::from);
    match &snapshot_path {
        Some(path) => tracing::info!("Serving snapshot from {:?}", path),
        None => tracing::info!("Serving built-in snapshot"),
    }
    let snapshot = AppState::load_snapshot(snapshot_path.as_deref())?;

    let server_config = ServerConfig::from(&config.api);
    let state = AppState::new(snapshot, server_config.clone());

    serve(state, &server_config).await?;

    tracing::info!("JalDrishti API server stopped");
    Ok(())
}
