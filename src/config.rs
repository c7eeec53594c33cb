use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Result, TaskverseError};

#[derive(Deserialize, Default)]
pub struct Config {
    /// Email of the acting user; every command authenticates as them.
    pub user: Option<String>,
    /// Organization slug used when --org is not given.
    pub default_org: Option<String>,
    /// Project key used when --project is not given.
    pub default_project: Option<String>,
    /// Override for the store file location.
    pub store_path: Option<PathBuf>,
    /// Request timeout for board mutations, in seconds.
    pub request_timeout: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| TaskverseError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        toml::from_str(&contents).map_err(|e| TaskverseError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "taskverse")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(TaskverseError::NoConfigDir)
    }

    /// Acting user with env var taking precedence over config file
    pub fn user(&self) -> Option<String> {
        if let Ok(user) = std::env::var("TASKVERSE_USER") {
            return Some(user);
        }
        self.user.clone()
    }

    /// Get organization slug, preferring explicit argument over default
    pub fn resolve_org(&self, explicit: Option<&str>) -> Option<String> {
        explicit.map(String::from).or_else(|| self.default_org.clone())
    }

    /// Get project key, preferring explicit argument over default
    pub fn resolve_project(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(String::from)
            .or_else(|| self.default_project.clone())
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => crate::store::Store::default_path(),
        }
    }
}
