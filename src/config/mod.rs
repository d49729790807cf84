//! Configuration module for exiftags.
//!
//! Handles the settings file, environment variables, and defaults.

mod settings;

pub use settings::{
    expand_env_vars, ServerSettings, Settings, SettingsError, ToolSettings, CONFIG_ENV_VAR,
};
