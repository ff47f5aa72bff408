// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Validator.
//!
//! Turns an untyped JSON submission into a canonical [`Event`]. Only `type`
//! and `title` are enforced; everything else is defaulted.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::event::{Event, EventType};

/// Validates `raw` and stamps it with the current time.
pub fn validate(raw: &Value) -> Result<Event, ValidationError> {
    validate_at(raw, Utc::now())
}

/// Same as [`validate`] with an explicit acceptance time.
pub fn validate_at(raw: &Value, now: DateTime<Utc>) -> Result<Event, ValidationError> {
    let obj = raw.as_object();
    let text_field = |name: &str| {
        obj.and_then(|o| o.get(name))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    let (kind, title) = match (text_field("type"), text_field("title")) {
        (Some(kind), Some(title)) => (kind, title),
        (kind, title) => {
            let mut missing = Vec::with_capacity(2);
            if kind.is_none() {
                missing.push("type");
            }
            if title.is_none() {
                missing.push("title");
            }
            return Err(ValidationError::MissingField(missing));
        }
    };

    let kind = EventType::parse(kind)
        .ok_or_else(|| ValidationError::UnknownType(kind.to_string()))?;

    let description = match obj.and_then(|o| o.get("description")) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let metadata = match obj.and_then(|o| o.get("metadata")) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(m)) => m.clone(),
        Some(other) => {
            let mut m = Map::new();
            m.insert("value".to_string(), other.clone());
            m
        }
    };

    Ok(Event::new(now, kind, title, description, metadata))
}
