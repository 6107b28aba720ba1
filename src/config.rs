//! Configuration management for the memory store server
//!
//! Loads settings from `config.toml` with environment overrides and
//! validates them before startup.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::LockSettings;

/// Complete server configuration, fixed for the process lifetime.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind the command connection
    pub bind_address: String,

    /// Port for the command connection
    pub port: u16,

    /// Root directory holding all namespaces
    pub storage_root: String,

    /// Namespace served by this instance; virtual paths live under
    /// `/<namespace>`
    pub namespace: String,

    /// Lock acquisition budget for read-mode operations
    pub read_lock_wait_ms: u64,

    /// Lock acquisition budget for write-mode operations
    pub write_lock_wait_ms: u64,

    /// Age past which a lock marker counts as abandoned
    pub lock_stale_ms: u64,

    /// Delay between lock acquisition attempts
    pub lock_retry_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 7171,
            storage_root: "./store_root".to_string(),
            namespace: "memories".to_string(),
            read_lock_wait_ms: 3_000,
            write_lock_wait_ms: 10_000,
            lock_stale_ms: 30_000,
            lock_retry_delay_ms: 50,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml (optional) with MEMVAULT_*
    /// environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("MEMVAULT"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.storage_root.is_empty() {
            return Err(config::ConfigError::Message(
                "storage_root cannot be empty".into(),
            ));
        }

        if self.namespace.is_empty() || self.namespace.contains('/') {
            return Err(config::ConfigError::Message(
                "namespace must be a single non-empty path segment".into(),
            ));
        }

        if self.write_lock_wait_ms < self.read_lock_wait_ms {
            return Err(config::ConfigError::Message(
                "write_lock_wait_ms must be at least read_lock_wait_ms".into(),
            ));
        }

        if self.lock_stale_ms == 0 || self.lock_retry_delay_ms == 0 {
            return Err(config::ConfigError::Message(
                "lock_stale_ms and lock_retry_delay_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as socket address
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get storage root as PathBuf
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    /// Lock budgets and thresholds as Durations
    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            read_wait: Duration::from_millis(self.read_lock_wait_ms),
            write_wait: Duration::from_millis(self.write_lock_wait_ms),
            stale_after: Duration::from_millis(self.lock_stale_ms),
            retry_delay: Duration::from_millis(self.lock_retry_delay_ms),
        }
    }
}
