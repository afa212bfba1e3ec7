//! Configuration module for cubequery.
//!
//! Handles the settings file, environment variables, and defaults.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, LoggingSettings, PivotSettings, QuerySettings, Settings,
    SettingsError,
};
