//! TOML-based configuration.
//!
//! Supports a config file (optimize-reports.toml) with environment variable
//! expansion in paths.
//!
//! Example configuration:
//! ```toml
//! [evaluation]
//! bucket_limit = 500
//! automatic_date_buckets = 80
//!
//! [store]
//! backend = "sqlite"
//! path = "${HOME}/.local/share/optimize-reports/reports.db"
//!
//! [logging]
//! filter = "optimize_reports=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::reconcile::DEFAULT_BUCKET_LIMIT;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "OPTIMIZE_REPORTS_CONFIG";

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

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub evaluation: EvaluationSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

/// Evaluation limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Most keys a reconciled axis may hold.
    pub bucket_limit: usize,

    /// Bucket count an automatic date grouping aims for.
    pub automatic_date_buckets: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            bucket_limit: DEFAULT_BUCKET_LIMIT,
            automatic_date_buckets: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Definition store configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// Database file for the sqlite backend (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl StoreSettings {
    /// Database path with environment variables expanded, if one is configured.
    pub fn resolved_path(&self) -> SettingsResult<Option<PathBuf>> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing filter, used when RUST_LOG is unset.
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
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> SettingsResult<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `OPTIMIZE_REPORTS_CONFIG`
    /// 2. `./optimize-reports.toml`
    /// 3. `<config dir>/optimize-reports/config.toml`
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("optimize-reports.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("optimize-reports").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> SettingsResult<()> {
        if self.evaluation.bucket_limit == 0 {
            return Err(SettingsError::InvalidConfig(
                "evaluation.bucket_limit must be at least 1".to_string(),
            ));
        }
        if self.evaluation.automatic_date_buckets == 0 {
            return Err(SettingsError::InvalidConfig(
                "evaluation.automatic_date_buckets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept as is.
pub fn expand_env_vars(s: &str) -> SettingsResult<String> {
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
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }
            if !closed {
                return Err(SettingsError::InvalidConfig(format!(
                    "unterminated variable reference in '{}'",
                    s
                )));
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
