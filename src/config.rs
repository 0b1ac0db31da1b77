use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "relief-tracker";
const CONFIG_FILE: &str = "config.json";
const ERROR_LOG_FILE: &str = "errors.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file. Falls back to the per-user data directory.
    pub database_path: Option<PathBuf>,
    /// Append-only error log. Falls back to the per-user data directory.
    pub error_log_path: Option<PathBuf>,
    /// Directory holding `<language>.xml` translation files.
    pub translations_dir: PathBuf,
    /// Translation resource, e.g. `en-CA` or `fr-CA`.
    pub language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            error_log_path: None,
            translations_dir: PathBuf::from("data"),
            language: "en-CA".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the user's config directory.
    /// Returns default config if file doesn't exist or fails to parse.
    pub fn load() -> Self {
        match get_config_path().and_then(|path| Self::try_load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Like [`load`](Self::load), for an explicit file.
    pub fn load_from(path: &Path) -> Self {
        Self::try_load_from(path).unwrap_or_else(|e| {
            tracing::warn!(
                path = %path.display(),
                "Failed to load config, using defaults: {:#}",
                e
            );
            Self::default()
        })
    }

    /// Save the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::db::Database::default_path(),
        }
    }

    pub fn error_log_path(&self) -> Result<PathBuf> {
        match &self.error_log_path {
            Some(path) => Ok(path.clone()),
            None => {
                let dirs = directories::ProjectDirs::from("", "", APP_NAME)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
                Ok(dirs.data_dir().join(ERROR_LOG_FILE))
            }
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
