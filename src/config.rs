use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::calibration::{CalibrationEngine, CalibrationTables};
use crate::error::BodyCompError;
use crate::logging::LogConfig;

/// Environment variable overriding the measurement database path
pub const DB_PATH_ENV: &str = "BODYCOMP_DB";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,

    /// Calibration constants, fitted offline
    #[serde(default)]
    pub calibration: CalibrationTables,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// SQLite file name inside `data_dir`
    pub database_file: String,

    /// Rows shown by `show` when no limit is given
    pub display_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            settings: AppSettings::default(),
            logging: LogConfig::default(),
            calibration: CalibrationTables::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bodycomp"),
            database_file: "body_comp.db".to_string(),
            display_limit: 14,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bodycomp")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults.
    ///
    /// A missing file yields defaults. A file that exists but cannot be
    /// parsed is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            if path.is_some() {
                warn!(path = %config_path.display(), "Config file not found, using defaults");
            }
            return Ok(Self::default());
        }

        Self::load_from_file(&config_path)
    }

    /// Database location, honouring `BODYCOMP_DB`
    pub fn database_path(&self) -> PathBuf {
        match std::env::var_os(DB_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => self.settings.data_dir.join(&self.settings.database_file),
        }
    }

    /// Validate the calibration section and build an engine from it
    pub fn build_engine(&self) -> std::result::Result<CalibrationEngine, BodyCompError> {
        Ok(CalibrationEngine::new(self.calibration.clone())?)
    }
}
