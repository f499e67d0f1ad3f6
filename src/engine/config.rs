//! LeagueDesk Configuration Module
//! Handles loading and validating leaguedesk.config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::scheduling::candidate::MAX_DURATION_MINUTES;
use crate::engine::scheduling::ConflictPolicy;

pub const CONFIG_FILE: &str = "leaguedesk.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub project: ProjectConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub db_type: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

/// Match scheduling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingConfig {
    /// Used for candidates that carry no duration of their own
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: default_duration_minutes(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

fn default_port() -> u16 {
    54321
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_duration_minutes() -> u32 {
    60
}

impl Config {
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, project_dir: &Path) -> Result<(), ConfigError> {
        let config_path = project_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let minutes = self.scheduling.default_duration_minutes;
        if minutes == 0 || minutes > MAX_DURATION_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "scheduling.defaultDurationMinutes must be between 1 and {}",
                MAX_DURATION_MINUTES
            )));
        }
        Ok(())
    }

    /// Absolute path of the project database
    pub fn database_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.database.path)
    }

    pub fn default_for_project(name: &str) -> Self {
        Self {
            version: "0.1.0".to_string(),
            project: ProjectConfig {
                name: name.to_string(),
                id: format!("leaguedesk-{}", name.replace(' ', "-").to_lowercase()),
            },
            database: DatabaseConfig {
                db_type: "sqlite".to_string(),
                path: PathBuf::from("./data/leaguedesk.db"),
            },
            api: ApiConfig {
                port: default_port(),
                host: default_host(),
            },
            scheduling: SchedulingConfig::default(),
        }
    }
}
