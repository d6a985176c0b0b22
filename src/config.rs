use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "SERVIUS_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub agilefant: AgilefantConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Seconds to wait for each request line, header line or body chunk
    pub read_timeout_secs: u64,
    pub powered_by: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            read_timeout_secs: 30,
            powered_by: "Knoxius Servius".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgilefantConfig {
    pub base_url: String,
}

impl Default for AgilefantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://agilefant.cosc.canterbury.ac.nz:8080/agilefant302/".to_string(),
        }
    }
}

impl Config {
    /// Loads the config from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`: an optional YAML file named by
    /// `SERVIUS_CONFIG`, then the `LISTEN` and `READ_TIMEOUT_SECS` overrides.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(listen_addr) = lookup("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }
        if let Some(secs) = lookup("READ_TIMEOUT_SECS") {
            cfg.server.read_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("invalid READ_TIMEOUT_SECS: {secs:?}"))?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("invalid YAML config")
    }
}
