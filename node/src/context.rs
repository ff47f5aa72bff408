// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Caller context merged into every submission's metadata.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use headers::{HeaderMapExt, UserAgent};
use serde_json::{Map, Value};

/// Fixed tag identifying events that arrived over the network.
pub const SOURCE_TAG: &str = "remote-client";

const UNKNOWN: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientContext {
    pub ip: String,
    pub user_agent: String,
}

impl ClientContext {
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let ip = forwarded
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let user_agent = headers
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self { ip, user_agent }
    }

    /// Writes `ip`, `userAgent` and `source` into `raw.metadata`, creating the
    /// map when absent. Non-object submissions are left for the validator to
    /// reject.
    pub fn merge_into(&self, raw: &mut Value) {
        let Value::Object(obj) = raw else { return };

        let mut metadata = match obj.remove("metadata") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m,
            Some(other) => {
                let mut m = Map::new();
                m.insert("value".to_string(), other);
                m
            }
        };
        metadata.insert("ip".to_string(), Value::String(self.ip.clone()));
        metadata.insert("userAgent".to_string(), Value::String(self.user_agent.clone()));
        metadata.insert("source".to_string(), Value::String(SOURCE_TAG.to_string()));
        obj.insert("metadata".to_string(), Value::Object(metadata));
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_headers(&parts.headers, peer))
    }
}
