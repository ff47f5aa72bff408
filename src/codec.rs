// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Stream encodings.
//!
//! # Aggregate stream (compact line)
//! ```text
//! [2025-03-01T12:00:00.000Z] [ERROR] Crash - npe
//! ```
//!
//! # Typed streams (detailed record)
//! ```text
//! [2025-03-01T12:00:00.000Z] [ERROR] Crash - npe
//! {"timestamp":"2025-03-01T12:00:00Z","type":"error","title":"Crash",...}
//! ---
//! ```
//!
//! The JSON line is compact, so it never contains a raw newline and the
//! `\n---\n` terminator is unambiguous. Line breaks in titles and descriptions
//! are folded to spaces in the compact form only; the JSON keeps them.

use std::borrow::Cow;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType};

/// Delimiter line closing every detailed record.
pub const RECORD_DELIMITER: &str = "---";

pub(crate) const LINE_TERMINATOR: &str = "\n";
pub(crate) const RECORD_TERMINATOR: &str = "\n---\n";

/// One item returned by a read.
///
/// Serialized untagged: consumers see either a full event, a summary parsed
/// from the compact line, or the raw stored text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Event(Event),
    Summary(EventSummary),
    Raw(String),
}

impl Entry {
    pub fn title(&self) -> &str {
        match self {
            Entry::Event(e) => &e.title,
            Entry::Summary(s) => &s.title,
            Entry::Raw(raw) => raw,
        }
    }
}

/// Fields recovered from a compact aggregate line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EventSummary {
    /// A line that did not match the compact pattern.
    pub fn opaque(line: &str) -> Self {
        Self {
            timestamp: None,
            kind: None,
            title: line.to_string(),
            description: None,
        }
    }
}

fn single_line(s: &str) -> Cow<'_, str> {
    if s.contains(['\r', '\n']) {
        Cow::Owned(s.replace("\r\n", " ").replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(s)
    }
}

fn header(event: &Event) -> String {
    let mut line = format!(
        "[{}] [{}] {}",
        event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        event.kind.tag(),
        single_line(&event.title)
    );
    if !event.description.is_empty() {
        line.push_str(" - ");
        line.push_str(&single_line(&event.description));
    }
    line
}

/// Compact line form, newline-terminated.
pub fn encode_line(event: &Event) -> String {
    let mut line = header(event);
    line.push('\n');
    line
}

/// Detailed record form, delimiter-terminated.
pub fn encode_record(event: &Event) -> serde_json::Result<String> {
    let json = serde_json::to_string(event)?;
    Ok(format!("{}\n{}\n{}\n", header(event), json, RECORD_DELIMITER))
}

/// Cuts `bytes` after the last complete terminator. Anything past it belongs
/// to an append that has not finished (or was torn by a crash).
pub(crate) fn complete_prefix<'a>(bytes: &'a [u8], terminator: &str) -> &'a [u8] {
    let terminator = terminator.as_bytes();
    if bytes.len() < terminator.len() {
        return &[];
    }
    match bytes.windows(terminator.len()).rposition(|w| w == terminator) {
        Some(i) => &bytes[..i + terminator.len()],
        None => &[],
    }
}

/// Parses a compact aggregate line. Never fails.
pub fn parse_line(line: &str) -> Entry {
    let line = line.trim_end_matches(['\r', '\n']);
    Entry::Summary(parse_compact(line).unwrap_or_else(|| EventSummary::opaque(line)))
}

fn parse_compact(line: &str) -> Option<EventSummary> {
    let rest = line.strip_prefix('[')?;
    let (timestamp, rest) = rest.split_once("] [")?;
    let (tag, rest) = rest.split_once("] ")?;
    if timestamp.is_empty() || tag.is_empty() || rest.is_empty() {
        return None;
    }

    let (title, description) = match rest.split_once(" - ") {
        Some((title, desc)) if !title.is_empty() && !desc.is_empty() => (title, Some(desc)),
        _ => (rest, None),
    };

    Some(EventSummary {
        timestamp: Some(timestamp.to_string()),
        kind: Some(summary_kind(tag)),
        title: title.to_string(),
        description: description.map(str::to_string),
    })
}

/// Lowercased tag, with known types (aliases included) mapped to their
/// canonical name.
fn summary_kind(tag: &str) -> String {
    let lower = tag.to_ascii_lowercase();
    match EventType::parse(&lower) {
        Some(kind) => kind.as_str().to_string(),
        None => lower,
    }
}

/// Recovers the event embedded in a detailed record, falling back to the
/// trimmed raw text. Never fails.
pub fn parse_record(record: &str) -> Entry {
    let trimmed = record.trim();
    match extract_payload(trimmed).map(serde_json::from_str::<Event>) {
        Some(Ok(event)) => Entry::Event(event),
        Some(Err(e)) => {
            tracing::warn!("Unparsable record payload, returning raw text: {}", e);
            Entry::Raw(trimmed.to_string())
        }
        None => Entry::Raw(trimmed.to_string()),
    }
}

/// Slice from the first line opening with `{` through the last `}`.
fn extract_payload(record: &str) -> Option<&str> {
    let start = if record.starts_with('{') {
        0
    } else {
        record.find("\n{")? + 1
    };
    let end = record.rfind('}')?;
    (end >= start).then(|| &record[start..=end])
}
