//! # Configuration
//!
//! [`BusConfig`] holds the handful of knobs the bus process needs. Values come from an
//! optional JSON file named by `ACTOR_BUS_CONFIG`, then individual environment variables
//! override them:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ACTOR_BUS_PORT` | `port` | `5000` |
//! | `ACTOR_BUS_INBOUND_BUFFER` | `inbound_buffer` | `1024` |
//! | `ACTOR_BUS_CACHE_BUFFER` | `cache_buffer` | `32` |

use crate::bus::{BusError, DEFAULT_PORT};
use serde::Deserialize;
use std::str::FromStr;

pub const CONFIG_PATH_VAR: &str = "ACTOR_BUS_CONFIG";
pub const PORT_VAR: &str = "ACTOR_BUS_PORT";
pub const INBOUND_BUFFER_VAR: &str = "ACTOR_BUS_INBOUND_BUFFER";
pub const CACHE_BUFFER_VAR: &str = "ACTOR_BUS_CACHE_BUFFER";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Port the transport listens on.
    pub port: u16,
    /// Capacity of the transport's inbound stream.
    pub inbound_buffer: usize,
    /// Capacity of the cache actor's request channel.
    pub cache_buffer: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            inbound_buffer: 1024,
            cache_buffer: 32,
        }
    }
}

impl BusConfig {
    /// Loads the process configuration.
    pub fn from_env() -> Result<Self, BusError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BusError> {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .map_err(|e| BusError::Config(format!("{}: {}", path, e)))?;
                Self::from_json(&json)?
            }
            None => Self::default(),
        };

        if let Some(port) = parse_var(&lookup, PORT_VAR)? {
            config.port = port;
        }
        if let Some(buffer) = parse_var(&lookup, INBOUND_BUFFER_VAR)? {
            config.inbound_buffer = buffer;
        }
        if let Some(buffer) = parse_var(&lookup, CACHE_BUFFER_VAR)? {
            config.cache_buffer = buffer;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, BusError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BusError> {
        if self.inbound_buffer == 0 {
            return Err(BusError::Config("inbound_buffer must be positive".into()));
        }
        if self.cache_buffer == 0 {
            return Err(BusError::Config("cache_buffer must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, BusError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BusError::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(None),
    }
}
