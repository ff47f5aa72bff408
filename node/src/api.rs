// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use chrono::{DateTime, Utc};
use logbook::{Entry, EventType, StreamStats};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventType,
}

/// Query for `GET /logs` and the dashboard. `type` selects the stream.
///
/// `limit` is kept as text so that an unusable value falls back to the
/// default instead of rejecting the request.
#[derive(Deserialize, Debug, Default)]
pub struct ReadParams {
    #[serde(rename = "type")]
    pub selector: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub selector: &'static str,
    pub stream_name: String,
    pub count: usize,
    pub entries: Vec<Entry>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ClearParams {
    #[serde(rename = "type")]
    pub selector: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ClearResponse {
    pub success: bool,
    pub cleared: bool,
    pub selector: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ready: bool,
    pub status: &'static str,
    pub log_dir: String,
    pub streams: Vec<StreamStats>,
}
