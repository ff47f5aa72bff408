// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use logbook::{LogStore, StoreOptions};
use logbook_node::config::NodeConfig;
use logbook_node::server::{build_router, AppState};
use logbook_node::telemetry::init_telemetry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_telemetry()?;

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing Logbook Node with config: {:?}", cfg);

    // Provisions the log directory; stream files appear on first append.
    let store = LogStore::open_with(&cfg.log_dir, StoreOptions { fsync: cfg.fsync })?;
    if !store.health().ready {
        tracing::warn!("Log directory {:?} is not writable; appends will fail", cfg.log_dir);
    }

    let state = AppState::new(Arc::new(store), &cfg);
    let app = build_router(state);

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
