use crate::constants::{BUFFER_SIZE, DEFAULT_PORT, DEFAULT_ROOT_DIR, MAX_CLIENTS};
use crate::core_error::FtpdError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub root_dir: String,
    pub max_clients: u32,
    pub buffer_size: usize,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_PORT,
            root_dir: String::from(DEFAULT_ROOT_DIR),
            max_clients: MAX_CLIENTS,
            buffer_size: BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Checks the values that cannot be expressed by the types alone.
    pub fn validate(&self) -> Result<(), FtpdError> {
        if self.listen_port == 0 {
            return Err(FtpdError::InvalidPort(0));
        }
        if self.buffer_size == 0 {
            return Err(FtpdError::InvalidBufferSize);
        }
        Ok(())
    }

    /// Backlog handed to `listen(2)`; a zero value falls back to the default.
    pub fn backlog(&self) -> u32 {
        if self.max_clients == 0 {
            MAX_CLIENTS
        } else {
            self.max_clients
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path).with_context(|| {
            format!("Failed to read configuration file: {}", path.display())
        })?;
        Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }

    /// Applies the command-line overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, port: Option<u16>, root: Option<String>) {
        if let Some(port) = port {
            self.server.listen_port = port;
        }
        if let Some(root) = root {
            self.server.root_dir = root;
        }
    }
}
