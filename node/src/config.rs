// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the aggregate and typed stream files.
    pub log_dir: PathBuf,
    pub fsync: bool,
    /// Used by `GET /logs` when no usable `limit` is given.
    pub default_read_limit: usize,
    /// Entries shown by the dashboard when no usable `limit` is given.
    pub dashboard_limit: usize,
    pub max_read_limit: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_dir: PathBuf::from("logs"),
            fsync: true,
            default_read_limit: 100,
            dashboard_limit: 50,
            max_read_limit: 1000,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `LOGBOOK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("LOGBOOK_BIND_ADDR") {
            cfg.bind_addr = parse("LOGBOOK_BIND_ADDR", v)?;
        }
        if let Some(v) = lookup("LOGBOOK_LOG_DIR") {
            cfg.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOGBOOK_FSYNC") {
            cfg.fsync = match v.as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::InvalidValue { var: "LOGBOOK_FSYNC", value: v }),
            };
        }
        if let Some(v) = lookup("LOGBOOK_MAX_READ_LIMIT") {
            let max: usize = parse("LOGBOOK_MAX_READ_LIMIT", v.clone())?;
            if max == 0 {
                return Err(ConfigError::InvalidValue { var: "LOGBOOK_MAX_READ_LIMIT", value: v });
            }
            cfg.max_read_limit = max;
        }

        Ok(cfg)
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue { var, value })
}
