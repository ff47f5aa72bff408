// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event model.
//!
//! An `Event` is produced once by the validator and never mutated afterwards.
//! Both stored representations (compact line, detailed record) are derived
//! from the same value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Closed set of event categories.
///
/// `info` is the canonical name. Older clients and older records use `log`
/// for the same category; it is accepted on input and always written as
/// `info`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    #[serde(alias = "log")]
    Info,
    Error,
    ApiFailed,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Info, EventType::Error, EventType::ApiFailed];

    /// Wire names accepted on input, aliases included.
    pub const ACCEPTED: [&'static str; 4] = ["info", "log", "error", "api-failed"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" | "log" => Some(EventType::Info),
            "error" => Some(EventType::Error),
            "api-failed" => Some(EventType::ApiFailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Info => "info",
            EventType::Error => "error",
            EventType::ApiFailed => "api-failed",
        }
    }

    /// Tag used inside the compact line form, e.g. `[API-FAILED]`.
    pub fn tag(&self) -> &'static str {
        match self {
            EventType::Info => "INFO",
            EventType::Error => "ERROR",
            EventType::ApiFailed => "API-FAILED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted log event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Event {
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: EventType,
        title: impl Into<String>,
        description: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            title: title.into(),
            description: description.into(),
            metadata,
        }
    }
}
