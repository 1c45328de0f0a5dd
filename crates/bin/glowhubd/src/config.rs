//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `glowhub.toml` in the working directory (or the file named by
//! `GLOWHUB_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use glowhub_app::hub::HubConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Stale-device sweep.
    pub registry: RegistryConfig,
    /// Broadcast hub tuning.
    pub hub: HubSettings,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Registry cleanup configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Seconds between two sweeps.
    pub cleanup_interval_secs: u64,
    /// Devices not seen for this many seconds are removed.
    pub device_timeout_secs: u64,
}

/// Broadcast hub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub outbox_capacity: usize,
    pub distribution_capacity: usize,
    pub keepalive_interval_secs: u64,
    pub keepalive_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub drain_timeout_secs: u64,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo lights.
    pub virtual_enabled: bool,
    /// Seconds between two virtual discovery passes.
    pub virtual_interval_secs: u64,
}

impl Config {
    /// Load configuration from `glowhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("GLOWHUB_CONFIG").unwrap_or_else(|_| "glowhub.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GLOWHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("GLOWHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("GLOWHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("GLOWHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.hub.keepalive_timeout_secs <= self.hub.keepalive_interval_secs {
            return Err(ConfigError::Validation(
                "hub.keepalive_timeout_secs must exceed hub.keepalive_interval_secs".to_string(),
            ));
        }
        if self.hub.keepalive_interval_secs == 0 || self.hub.write_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hub.keepalive_interval_secs and hub.write_timeout_secs must be non-zero"
                    .to_string(),
            ));
        }
        if self.hub.outbox_capacity == 0 || self.hub.distribution_capacity == 0 {
            return Err(ConfigError::Validation(
                "hub capacities must be non-zero".to_string(),
            ));
        }
        if self.registry.cleanup_interval_secs == 0 || self.integrations.virtual_interval_secs == 0
        {
            return Err(ConfigError::Validation(
                "intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbox_capacity: self.hub.outbox_capacity,
            distribution_capacity: self.hub.distribution_capacity,
            keepalive_interval: Duration::from_secs(self.hub.keepalive_interval_secs),
            keepalive_timeout: Duration::from_secs(self.hub.keepalive_timeout_secs),
            write_timeout: Duration::from_secs(self.hub.write_timeout_secs),
            drain_timeout: Duration::from_secs(self.hub.drain_timeout_secs),
        }
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.registry.cleanup_interval_secs)
    }

    #[must_use]
    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.device_timeout_secs)
    }

    #[must_use]
    pub fn virtual_interval(&self) -> Duration {
        Duration::from_secs(self.integrations.virtual_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "glowhubd=info,glowhub_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 30,
            device_timeout_secs: 120,
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        let defaults = HubConfig::default();
        Self {
            outbox_capacity: defaults.outbox_capacity,
            distribution_capacity: defaults.distribution_capacity,
            keepalive_interval_secs: defaults.keepalive_interval.as_secs(),
            keepalive_timeout_secs: defaults.keepalive_timeout.as_secs(),
            write_timeout_secs: defaults.write_timeout.as_secs(),
            drain_timeout_secs: defaults.drain_timeout.as_secs(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            virtual_interval_secs: 15,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
