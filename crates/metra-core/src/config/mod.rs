//! Metra configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Top-level configuration.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`METRA_*`)
/// 2. Project config (`metra.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetraConfig {
    pub storage: StorageConfig,
    pub mapping: MappingConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file backing the table stores.
    pub database: PathBuf,
    /// Logical table the report pipeline writes to.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("metra.db"),
            table: "report".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MappingConfig {
    /// Path to the JSON mapping specification, if any.
    pub spec_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Row cap for unbounded selects; 0 is normalized by the store to
    /// its default of 10000.
    pub select_limit: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            select_limit: 10_000,
        }
    }
}

impl MetraConfig {
    /// Load configuration with layered resolution (see type docs).
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config = root.join("metra.toml");
        if project_config.exists() {
            let text = std::fs::read_to_string(&project_config).map_err(|e| ConfigError::Io {
                path: project_config.display().to_string(),
                message: e.to_string(),
            })?;
            config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: project_config.display().to_string(),
                message: e.to_string(),
            })?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut Self) {
        if let Ok(database) = std::env::var("METRA_DATABASE") {
            config.storage.database = PathBuf::from(database);
        }
        if let Ok(table) = std::env::var("METRA_TABLE") {
            config.storage.table = table;
        }
        if let Ok(spec_path) = std::env::var("METRA_MAPPING_SPEC") {
            config.mapping.spec_path = Some(PathBuf::from(spec_path));
        }
        if let Ok(limit) = std::env::var("METRA_SELECT_LIMIT") {
            if let Ok(limit) = limit.parse() {
                config.report.select_limit = limit;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(config: &Self) -> Result<(), ConfigError> {
        if config.storage.table.is_empty() {
            return Err(ConfigError::Validation {
                field: "storage.table".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if config.report.select_limit > 1_000_000 {
            return Err(ConfigError::Validation {
                field: "report.select_limit".to_string(),
                message: "must be at most 1000000".to_string(),
            });
        }
        Ok(())
    }
}
