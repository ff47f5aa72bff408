// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod context;
pub mod dashboard;
pub mod server;
pub mod telemetry;
