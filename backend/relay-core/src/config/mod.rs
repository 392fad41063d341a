//! Relay configuration: dashboard host and password, refresh timing.
//!
//! Stored as `config.json` in a caller-supplied directory. Environment
//! variables (optionally from a `.env` file) override the stored dashboard
//! values.

use crate::error::ConfigError;
use crate::requester::DEFAULT_REFRESH_TIMEOUT;
use crate::session_client::DashboardSettings;

use common::{ErrorLocation, RedactedPassword};

use std::env;
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;
const MIN_REFRESH_TIMEOUT_MS: u64 = 100;
const MAX_REFRESH_TIMEOUT_MS: u64 = 600_000;

pub const HOST_URL_ENV: &str = "STATUSHUB_HOST_URL";
pub const PASSWORD_ENV: &str = "STATUSHUB_PASSWORD";

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub host_url: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("host_url", &self.host_url)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayTiming {
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
}

impl Default for RelayTiming {
    fn default() -> Self {
        Self {
            refresh_timeout_ms: default_refresh_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub relay: RelayTiming,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            dashboard: DashboardConfig::default(),
            relay: RelayTiming::default(),
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_refresh_timeout_ms() -> u64 {
    DEFAULT_REFRESH_TIMEOUT.as_millis() as u64
}

impl RelayConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        let config: RelayConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json through a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, serialization or any file operation fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        let timeout = self.relay.refresh_timeout_ms;
        if !(MIN_REFRESH_TIMEOUT_MS..=MAX_REFRESH_TIMEOUT_MS).contains(&timeout) {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid refresh timeout: {timeout}ms (must be {MIN_REFRESH_TIMEOUT_MS}-{MAX_REFRESH_TIMEOUT_MS})"
                ),
            });
        }

        if let Some(ref url) = self.dashboard.host_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Invalid host URL: {}", url),
                });
            }
        }

        Ok(())
    }

    /// Override dashboard values from the environment.
    ///
    /// Loads `.env` from the current directory when present, then reads
    /// [`HOST_URL_ENV`] and [`PASSWORD_ENV`]. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] for a variable that is not valid
    /// unicode, and [`ConfigError::Validation`] if the result fails validation.
    pub fn apply_env_overrides(&mut self) -> Result<bool, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded .env from: {:?}", path),
            Err(e) => debug!("No .env file loaded: {e}"),
        }

        let mut changed = false;
        if let Some(host_url) = read_env(HOST_URL_ENV)? {
            info!("Dashboard host overridden by {HOST_URL_ENV}");
            self.dashboard.host_url = Some(host_url);
            changed = true;
        }
        if let Some(password) = read_env(PASSWORD_ENV)? {
            info!(
                "Dashboard password overridden by {PASSWORD_ENV} ({} chars)",
                password.len()
            );
            self.dashboard.password = Some(password);
            changed = true;
        }

        self.validate()?;
        Ok(changed)
    }

    /// Settings the handheld relay needs to reach the dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the host or password is missing.
    pub fn dashboard_settings(&self) -> Result<DashboardSettings, ConfigError> {
        let host_url = self
            .dashboard
            .host_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("Dashboard host URL is not configured"),
            })?;

        let password = self
            .dashboard
            .password
            .clone()
            .ok_or_else(|| ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("Dashboard password is not configured"),
            })?;

        Ok(DashboardSettings {
            host_url,
            password: RedactedPassword::new(password),
        })
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.relay.refresh_timeout_ms)
    }
}

fn read_env(variable: &str) -> Result<Option<String>, ConfigError> {
    match env::var(variable) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Environment {
            location: ErrorLocation::from(Location::caller()),
            variable: variable.to_string(),
            reason: String::from("contains invalid unicode"),
        }),
    }
}
