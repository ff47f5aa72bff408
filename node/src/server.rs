// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use logbook::{validate, ClearTarget, EventType, LogStore, StoreResult, StreamName, ValidationError};

use crate::api::*;
use crate::config::NodeConfig;
use crate::context::ClientContext;
use crate::dashboard::{self, DashboardView};
use crate::errors::ApiError;
use crate::telemetry;

/// The one store instance, shared by every handler.
pub type SharedStore = Arc<LogStore>;

#[derive(Clone, Copy, Debug)]
pub struct ReadLimits {
    pub default: usize,
    pub dashboard: usize,
    pub max: usize,
}

impl ReadLimits {
    pub fn from_config(cfg: &NodeConfig) -> Self {
        Self {
            default: cfg.default_read_limit,
            dashboard: cfg.dashboard_limit,
            max: cfg.max_read_limit,
        }
    }

    /// Missing, unparsable or zero limits fall back to `default`; large ones
    /// are clamped to `max`.
    pub fn resolve(&self, raw: Option<&str>, default: usize) -> usize {
        raw.and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(default)
            .min(self.max)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub limits: ReadLimits,
}

impl AppState {
    pub fn new(store: SharedStore, cfg: &NodeConfig) -> Self {
        Self {
            store,
            limits: ReadLimits::from_config(cfg),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/logs", post(submit_log).get(read_logs).delete(clear_logs))
        // Shorthand for POST /logs with a fixed type
        .route("/logs/info", post(submit_info))
        .route("/logs/error", post(submit_error))
        .route("/logs/api-failed", post(submit_api_failed))
        .route("/health", get(health))
        .route("/", get(dashboard_page))
        .route("/dashboard", get(dashboard_page))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs a store operation off the async runtime.
async fn blocking<T, F>(op: &'static str, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("{} task failed: {}", op, e)))?;

    result.map_err(|e| {
        metrics::increment_counter!(telemetry::STORE_FAILURES, "op" => op);
        ApiError::from(e)
    })
}

async fn submit(
    state: &AppState,
    ctx: &ClientContext,
    mut body: Value,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    ctx.merge_into(&mut body);

    let event = validate(&body).map_err(|e| {
        let reason = match &e {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::UnknownType(_) => "unknown_type",
        };
        metrics::increment_counter!(telemetry::EVENTS_REJECTED, "reason" => reason);
        tracing::debug!("Rejected submission: {}", e);
        ApiError::from(e)
    })?;

    let store = state.store.clone();
    let started = Instant::now();
    let event = blocking("append", move || store.append(&event).map(|()| event)).await?;

    metrics::histogram!(telemetry::APPEND_DURATION, started.elapsed().as_secs_f64());
    metrics::increment_counter!(telemetry::EVENTS_ACCEPTED, "type" => event.kind.as_str());

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: "Log recorded",
            timestamp: event.timestamp,
            kind: event.kind,
        }),
    ))
}

/// Sets `type` on the submission, replacing whatever the client sent.
async fn submit_as(
    state: &AppState,
    ctx: &ClientContext,
    mut body: Value,
    kind: EventType,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let kind_value = Value::String(kind.as_str().to_string());
    match &mut body {
        Value::Object(obj) => {
            obj.insert("type".to_string(), kind_value);
        }
        _ => {
            let mut obj = serde_json::Map::new();
            obj.insert("type".to_string(), kind_value);
            body = Value::Object(obj);
        }
    }
    submit(state, ctx, body).await
}

async fn submit_log(
    State(state): State<AppState>,
    ctx: ClientContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    submit(&state, &ctx, body).await
}

async fn submit_info(
    State(state): State<AppState>,
    ctx: ClientContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    submit_as(&state, &ctx, body, EventType::Info).await
}

async fn submit_error(
    State(state): State<AppState>,
    ctx: ClientContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    submit_as(&state, &ctx, body, EventType::Error).await
}

async fn submit_api_failed(
    State(state): State<AppState>,
    ctx: ClientContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    submit_as(&state, &ctx, body, EventType::ApiFailed).await
}

fn stream_selector(raw: Option<&str>) -> Result<StreamName, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(StreamName::Aggregate),
        Some(s) => StreamName::parse(s).ok_or_else(|| ApiError::InvalidSelector {
            selector: s.to_string(),
            allowed: StreamName::ALL.iter().map(|n| n.as_str()).collect(),
        }),
    }
}

fn clear_selector(raw: Option<&str>) -> Result<ClearTarget, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(ClearTarget::All),
        Some(s) => ClearTarget::parse(s).ok_or_else(|| ApiError::InvalidSelector {
            selector: s.to_string(),
            allowed: std::iter::once("all")
                .chain(StreamName::ALL.iter().map(|n| n.as_str()))
                .collect(),
        }),
    }
}

async fn read_logs(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<Json<ReadResponse>, ApiError> {
    let name = stream_selector(params.selector.as_deref())?;
    let limit = state.limits.resolve(params.limit.as_deref(), state.limits.default);

    let store = state.store.clone();
    let entries = blocking("read", move || store.read(name, limit)).await?;

    Ok(Json(ReadResponse {
        success: true,
        selector: name.as_str(),
        stream_name: name.file_name(),
        count: entries.len(),
        entries,
    }))
}

async fn clear_logs(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Result<Json<ClearResponse>, ApiError> {
    let target = clear_selector(params.selector.as_deref())?;

    let store = state.store.clone();
    blocking("clear", move || store.clear(target)).await?;

    metrics::increment_counter!(telemetry::CLEARS, "selector" => target.as_str());
    tracing::info!("Cleared {} log stream(s)", target.as_str());

    Ok(Json(ClearResponse {
        success: true,
        cleared: true,
        selector: target.as_str(),
    }))
}

async fn health(State(state): State<AppState>) -> Result<(StatusCode, Json<HealthResponse>), ApiError> {
    let store = state.store.clone();
    let (health, streams) = blocking("health", move || Ok((store.health(), store.stats()))).await?;

    let ready = health.ready;
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    Ok((
        status,
        Json(HealthResponse {
            ready,
            status: if ready { "ok" } else { "unavailable" },
            log_dir: state.store.dir().display().to_string(),
            streams,
        }),
    ))
}

async fn dashboard_page(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<Html<String>, ApiError> {
    let name = stream_selector(params.selector.as_deref())?;
    let limit = state.limits.resolve(params.limit.as_deref(), state.limits.dashboard);

    let store = state.store.clone();
    let (entries, stats) = blocking("read", move || {
        let entries = store.read(name, limit)?;
        Ok((entries, store.stats()))
    })
    .await?;

    Ok(Html(dashboard::render(&DashboardView {
        selected: name,
        entries: &entries,
        stats: &stats,
        limit,
    })))
}

async fn metrics_handler() -> String {
    telemetry::get_metrics()
}
