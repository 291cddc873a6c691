//! Configuration module for the SensorThings core.
//!
//! Handles the settings file, environment variables, and defaults.

mod settings;

pub use settings::{
    expand_env_vars, LoggingSettings, PersistenceSettings, QuerySettings, Settings, SettingsError,
};
