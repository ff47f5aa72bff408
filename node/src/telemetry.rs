// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const EVENTS_ACCEPTED: &str = "logbook_events_accepted_total";
pub const EVENTS_REJECTED: &str = "logbook_events_rejected_total";
pub const STORE_FAILURES: &str = "logbook_store_failures_total";
pub const CLEARS: &str = "logbook_clears_total";
pub const APPEND_DURATION: &str = "logbook_append_duration_seconds";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() -> Result<(), BuildError> {
    // 1. Tracing (logs)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "logbook_node=debug,logbook=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Metrics (Prometheus)
    let handle = PrometheusBuilder::new().install_recorder()?;
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!(EVENTS_ACCEPTED, "Events appended to the store, by type");
    metrics::describe_counter!(EVENTS_REJECTED, "Submissions rejected by validation, by reason");
    metrics::describe_counter!(STORE_FAILURES, "Store operations that returned an IO error, by operation");
    metrics::describe_counter!(CLEARS, "Clear operations, by selector");
    metrics::describe_histogram!(APPEND_DURATION, "Time taken to append one event to both streams");

    metrics::gauge!("logbook_node_up", 1.0);
    Ok(())
}

/// Prometheus text exposition of the current metrics.
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
