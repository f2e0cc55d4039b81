//! Configuration.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, EvaluationSettings, LoggingSettings, Settings, SettingsError,
    SettingsResult, StoreBackend, StoreSettings, CONFIG_ENV_VAR,
};
