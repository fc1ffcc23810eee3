//! Connection configuration loading
//!
//! A [`ConnectionConfig`] comes from exactly one [`ConfigSource`]: a JSON file
//! or the process environment. Every key is required; nothing is defaulted.
//!
//! # Example
//! ```rust,ignore
//! use docbridge_common::{ConfigSource, ConnectionConfig};
//!
//! // From a file
//! let config = ConnectionConfig::load(ConfigSource::from(Some("db.json")))?;
//!
//! // From `ip`, `port`, `username`, `password`, `db_name` env vars
//! let config = ConnectionConfig::load(ConfigSource::Environment)?;
//! ```

use crate::error::{DocBridgeError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Keys read from the file or the environment
pub const CONFIG_KEYS: [&str; 5] = ["ip", "port", "username", "password", "db_name"];

/// Where a [`ConnectionConfig`] is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// JSON file with the keys in [`CONFIG_KEYS`]
    File(PathBuf),
    /// Process environment variables named after [`CONFIG_KEYS`]
    Environment,
}

impl<P: Into<PathBuf>> From<Option<P>> for ConfigSource {
    fn from(path: Option<P>) -> Self {
        match path {
            Some(p) => ConfigSource::File(p.into()),
            None => ConfigSource::Environment,
        }
    }
}

/// Scalar settings needed to reach a document-store server
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub ip: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub db_name: String,
}

impl ConnectionConfig {
    /// Resolve a source into a config
    pub fn load(source: ConfigSource) -> Result<Self> {
        match source {
            ConfigSource::File(path) => Self::from_file(&path),
            ConfigSource::Environment => Self::from_env(),
        }
    }

    /// Read the config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DocBridgeError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            DocBridgeError::Config(format!(
                "Invalid config file {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), host = %config.ip, "loaded connection config from file");
        Ok(config)
    }

    /// Read the config from process environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        tracing::debug!(host = %config.ip, "loaded connection config from environment");
        Ok(config)
    }

    /// Read the config through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                DocBridgeError::Config(format!("Missing environment variable '{}'", key))
            })
        };

        let port_raw = required("port")?;
        let port = port_raw.trim().parse::<u16>().map_err(|e| {
            DocBridgeError::Config(format!("Invalid port '{}': {}", port_raw, e))
        })?;

        Ok(Self {
            ip: required("ip")?,
            port,
            username: required("username")?,
            password: required("password")?,
            db_name: required("db_name")?,
        })
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("db_name", &self.db_name)
            .finish()
    }
}
