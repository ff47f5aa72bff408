// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use logbook::{EventType, StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid type selector: {selector}")]
    InvalidSelector {
        selector: String,
        allowed: Vec<&'static str>,
    },
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(ValidationError::MissingField(fields)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Missing required fields",
                    "missingFields": fields,
                }),
            ),
            ApiError::Validation(ValidationError::UnknownType(kind)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Invalid log type",
                    "invalidType": kind,
                    "allowedTypes": EventType::ACCEPTED,
                }),
            ),
            ApiError::InvalidSelector { selector, allowed } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Invalid type selector",
                    "invalidType": selector,
                    "allowedTypes": allowed,
                }),
            ),
            ApiError::Store(e) => {
                tracing::error!("Log storage failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": "Failed to access log storage",
                        "details": e.to_string(),
                    }),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
