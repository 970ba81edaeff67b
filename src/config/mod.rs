use crate::{
    history::DEFAULT_HISTORY_CAPACITY,
    relay::DEFAULT_TEMP_THRESHOLD,
    storage::DEFAULT_STORE_PATH,
    transport::{
        TransportOptions, DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT, DEFAULT_CLIENT_ID,
        DEFAULT_TOPIC,
    },
    Error, Result,
};
use std::path::Path;

pub mod loader;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;
pub const MIN_TICK_INTERVAL_MS: u64 = 100;
pub const MAX_HISTORY_CAPACITY: usize = 100_000;
const CONFIG_DIR_NAME: &str = ".coolrelay";
const CONFIG_FILE_NAME: &str = "config.toml";

/// User-supplied settings loaded from the config file. Read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
    pub client_id: String,
    pub temp_threshold: f64,
    pub tick_interval_ms: u64,
    pub history_capacity: usize,
    pub store_path: String,
    pub synthetic_sensor: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_host: DEFAULT_BROKER_HOST.to_string(),
            broker_port: DEFAULT_BROKER_PORT,
            topic: DEFAULT_TOPIC.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            temp_threshold: DEFAULT_TEMP_THRESHOLD,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            store_path: DEFAULT_STORE_PATH.to_string(),
            synthetic_sensor: true,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            host: self.broker_host.clone(),
            port: self.broker_port,
            topic: self.topic.clone(),
            client_id: self.client_id.clone(),
        }
    }
}

/// Reject settings the daemon cannot run with.
pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.broker_host.trim().is_empty() {
        return Err(Error::InvalidArgs("broker_host must not be empty".into()));
    }
    if cfg.broker_port == 0 {
        return Err(Error::InvalidArgs("broker_port must be between 1 and 65535".into()));
    }
    if cfg.topic.is_empty() || cfg.topic.contains(['#', '+']) {
        return Err(Error::InvalidArgs(
            "topic must be a non-empty topic name without wildcards".into(),
        ));
    }
    if cfg.client_id.is_empty() {
        return Err(Error::InvalidArgs("client_id must not be empty".into()));
    }
    if !cfg.temp_threshold.is_finite() {
        return Err(Error::InvalidArgs("temp_threshold must be a finite number".into()));
    }
    if cfg.tick_interval_ms < MIN_TICK_INTERVAL_MS {
        return Err(Error::InvalidArgs(format!(
            "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
        )));
    }
    if cfg.history_capacity == 0 || cfg.history_capacity > MAX_HISTORY_CAPACITY {
        return Err(Error::InvalidArgs(format!(
            "history_capacity must be between 1 and {MAX_HISTORY_CAPACITY}"
        )));
    }
    if cfg.store_path.trim().is_empty() {
        return Err(Error::InvalidArgs("store_path must not be empty".into()));
    }
    Ok(())
}
