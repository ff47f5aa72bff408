// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! logbook: durable, type-partitioned storage for remote application events.
//!
//! Submissions pass through [`validate`] and become an immutable [`Event`];
//! the [`LogStore`] appends each event to the aggregate stream and to the
//! stream of its type, and serves bounded newest-first reads.

pub mod codec;
pub mod error;
pub mod event;
pub mod store;
pub mod validate;

pub use codec::{Entry, EventSummary};
pub use error::{StoreError, StoreResult, ValidationError};
pub use event::{Event, EventType};
pub use store::{ClearTarget, Health, LogStore, StoreOptions, StreamName, StreamStats};
pub use validate::{validate, validate_at};

#[cfg(test)]
pub mod tests;
