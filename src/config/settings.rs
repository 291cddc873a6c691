//! TOML-based configuration for the SensorThings core.
//!
//! Supports a config file (sensorthings.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [persistence]
//! database = "${STA_DB}"
//! id_generation_mode = "ServerAndClientGenerated"
//!
//! [query]
//! default_top = 100
//! max_top = 1000
//! always_order_by_id = true
//!
//! [logging]
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;
use crate::writer::IdGenerationMode;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub persistence: PersistenceSettings,
    pub query: QuerySettings,
    pub logging: LoggingSettings,
}

/// Backend and write policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// SQLite file path, or `:memory:` (supports ${ENV_VAR} expansion).
    pub database: String,

    /// One of `ServerGeneratedOnly`, `ServerAndClientGenerated`, `ClientGeneratedOnly`.
    pub id_generation_mode: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            database: ":memory:".to_string(),
            id_generation_mode: "ServerGeneratedOnly".to_string(),
        }
    }
}

impl PersistenceSettings {
    /// Get the database path with environment variables expanded.
    pub fn resolved_database(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.database)
    }

    /// Parse the configured ID generation mode.
    pub fn id_mode(&self) -> StoreResult<IdGenerationMode> {
        self.id_generation_mode.parse()
    }
}

/// Paging and ordering defaults for collection reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Page size when a collection request has no `$top`.
    pub default_top: u64,

    /// Upper bound for `$top`.
    pub max_top: u64,

    /// Append the root id as a final sort key.
    pub always_order_by_id: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_top: 100,
            max_top: 1000,
            always_order_by_id: true,
        }
    }
}

impl QuerySettings {
    /// Page size for a collection request.
    pub fn page_size(&self, top: Option<u64>) -> u64 {
        top.unwrap_or(self.default_top).min(self.max_top)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `env_logger` filter; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `STA_CONFIG`
    /// 2. `./sensorthings.toml`
    /// 3. `~/.config/sensorthings/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("STA_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sensorthings.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sensorthings").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.persistence
            .id_mode()
            .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;
        if self.query.default_top == 0 || self.query.max_top == 0 {
            return Err(SettingsError::InvalidConfig(
                "query.default_top and query.max_top must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
