//! TOML-based configuration for cubequery.
//!
//! Supports a config file (cubequery.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [query]
//! default_locale = "en"
//! default_limit = 0
//! preview_limit = 100
//!
//! [catalog]
//! topic_annotation = "topic"
//! subtopic_annotation = "subtopic"
//! table_annotation = "table"
//! hide_annotation = "hide_in_ui"
//! fallback_topic = "Other"
//!
//! [pivot]
//! aggregation = "sum"
//!
//! [logging]
//! filter = "${CUBEQUERY_LOG}"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pivot::Aggregation;

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
    /// Query defaults.
    pub query: QuerySettings,

    /// Catalog annotation keys.
    pub catalog: CatalogSettings,

    /// Pivot defaults.
    pub pivot: PivotSettings,

    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Defaults applied when building and encoding queries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Locale used when a query does not carry one.
    pub default_locale: String,

    /// Page size for new queries (0 disables pagination).
    pub default_limit: u64,

    /// Row cap applied to requests while a query is in preview mode.
    pub preview_limit: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            default_limit: 0,
            preview_limit: 100,
        }
    }
}

/// Annotation keys read from cubes when building the catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub topic_annotation: String,
    pub subtopic_annotation: String,
    pub table_annotation: String,

    /// Cubes with this annotation set to "true" are left out of the catalog.
    pub hide_annotation: String,

    /// Label used when a cube has no topic or subtopic annotation.
    pub fallback_topic: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            topic_annotation: "topic".to_string(),
            subtopic_annotation: "subtopic".to_string(),
            table_annotation: "table".to_string(),
            hide_annotation: "hide_in_ui".to_string(),
            fallback_topic: "Other".to_string(),
        }
    }
}

/// Pivot settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PivotSettings {
    /// Aggregation for repeated (row, column) pairs: sum, count, min, max, first, last.
    pub aggregation: String,
}

impl Default for PivotSettings {
    fn default() -> Self {
        Self {
            aggregation: "sum".to_string(),
        }
    }
}

impl PivotSettings {
    /// Parse the configured aggregation.
    pub fn aggregation(&self) -> Result<Aggregation, SettingsError> {
        self.aggregation.parse().map_err(|_| {
            SettingsError::InvalidConfig(format!(
                "unknown pivot aggregation '{}'",
                self.aggregation
            ))
        })
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing-subscriber` env-filter directive (supports ${ENV_VAR} expansion).
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Get the filter directive with environment variables expanded.
    pub fn resolved_filter(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.filter)
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
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.pivot.aggregation()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CUBEQUERY_CONFIG`
    /// 2. `./cubequery.toml`
    /// 3. `~/.config/cubequery/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("CUBEQUERY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cubequery.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cubequery").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
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
            // $VAR ends at the first non-alphanumeric, non-underscore char
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

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
