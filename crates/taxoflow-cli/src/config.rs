//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use taxoflow_pipeline::PipelineConfig;

/// Global configuration for taxoflow
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Holds `repository.json` and `jobs/`
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StoreConfig {
    pub fn repository_path(&self) -> PathBuf {
        self.data_dir.join("repository.json")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./taxoflow.toml (current directory)
    /// 2. ~/.config/taxoflow/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("taxoflow.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "taxoflow") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line overrides on top of the file settings.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, batch_size: Option<usize>) -> Self {
        if let Some(dir) = data_dir {
            self.store.data_dir = dir;
        }
        if let Some(size) = batch_size {
            self.pipeline.batch_size = size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.store.data_dir, PathBuf::from("./data"));
        assert_eq!(config.pipeline.batch_size, 1000);
        assert_eq!(
            config.store.repository_path(),
            PathBuf::from("./data/repository.json")
        );
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[pipeline]
batch_size = 250
progress_interval = 500

[store]
data_dir = "/tmp/taxoflow"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pipeline.batch_size, 250);
        assert_eq!(config.pipeline.centrality_batch_size, 1000);
        assert_eq!(config.pipeline.progress_interval, 500);
        assert_eq!(config.store.jobs_dir(), PathBuf::from("/tmp/taxoflow/jobs"));
    }

    #[test]
    fn overrides_win() {
        let config = Config::default().with_overrides(Some("/srv/tx".into()), Some(10));
        assert_eq!(config.store.data_dir, PathBuf::from("/srv/tx"));
        assert_eq!(config.pipeline.batch_size, 10);

        let untouched = Config::default().with_overrides(None, None);
        assert_eq!(untouched.pipeline.batch_size, 1000);
    }

    #[test]
    fn from_file_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxoflow.toml");
        std::fs::write(&path, "[pipeline\nbatch_size = ").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
