//! TOML configuration for the bridge daemon
//!
//! ```toml
//! [server]
//! port = 18090
//!
//! [api]
//! token = "..."
//!
//! [[vehicle]]
//! vin = "WDD2054231F123456"
//! max_range = 600
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use mecar_accessory::AccessoryConfig;
use mecar_client::{MeClient, DEFAULT_BASE_URL};
use serde::Deserialize;

/// Host bridge HTTP server
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    18090
}

/// Vendor API connection
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Build the vendor client for this connection
    pub fn client(&self) -> anyhow::Result<MeClient> {
        MeClient::with_options(
            &self.base_url,
            self.token.as_deref(),
            Duration::from_secs(self.timeout_secs),
            Duration::from_secs(self.connect_timeout_secs),
        )
        .with_context(|| format!("Failed to create client for {}", self.base_url))
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// HTTP surface; disabled when the section is absent
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default, rename = "vehicle")]
    pub vehicles: Vec<AccessoryConfig>,
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// Replace the configured token, e.g. with one from the environment
    pub fn override_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.vehicles.is_empty() {
            bail!("No [[vehicle]] configured");
        }
        if self.api.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            bail!("No API token configured (set api.token or MECAR_TOKEN)");
        }
        if self.api.timeout_secs == 0 || self.api.connect_timeout_secs == 0 {
            bail!("API timeouts must be greater than zero");
        }

        let mut seen = HashSet::new();
        for vehicle in &self.vehicles {
            vehicle.validate()?;
            if !seen.insert(vehicle.vin.as_str()) {
                bail!("Vehicle {} is configured more than once", vehicle.vin);
            }
        }
        Ok(())
    }
}
