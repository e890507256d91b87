use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    location::IpLocationSource, provider::open_meteo::DEFAULT_BASE_URL,
    store::FileCoordinateStore,
};

const DEFAULT_LOOKUP_URL: &str = "https://ipapi.co/json/";

/// Weather API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string() }
    }
}

/// Device location settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// The user agreed to have their position looked up.
    pub consent: bool,
    /// Positioning switch; `false` behaves like a device with GPS turned off.
    pub enabled: bool,
    pub lookup_url: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            consent: false,
            enabled: true,
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
        }
    }
}

/// Upper bounds on the two suspension points of a load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub location_secs: u64,
    pub fetch_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { location_secs: 10, fetch_secs: 15 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [location]
/// consent = true
/// enabled = true
///
/// [timeouts]
/// fetch_secs = 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Overrides where the last coordinate is kept.
    pub store_path: Option<PathBuf>,
    pub api: ApiConfig,
    pub location: LocationConfig,
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the saved coordinate, honouring `store_path`.
    pub fn coordinate_file_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("location.toml")),
        }
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.location_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.fetch_secs)
    }

    pub fn coordinate_store(&self) -> Result<FileCoordinateStore> {
        Ok(FileCoordinateStore::new(self.coordinate_file_path()?))
    }

    pub fn location_source(&self) -> Result<IpLocationSource> {
        IpLocationSource::new(
            self.location.lookup_url.clone(),
            self.location.consent,
            self.location.enabled,
            self.location_timeout(),
        )
        .context("Failed to build HTTP client for location lookup")
    }
}
