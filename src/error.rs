// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

/// Rejection produced by the validator. Nothing is written when this occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are absent, empty or not text.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),
    /// `type` is not a member of the event enumeration.
    #[error("Unknown event type: {0}")]
    UnknownType(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on stream {stream}: {source}")]
    Io {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(stream: &'static str, source: std::io::Error) -> Self {
        StoreError::Io { stream, source }
    }
}

pub type StoreResult<T> = core::result::Result<T, StoreError>;
