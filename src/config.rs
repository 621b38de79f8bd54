use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PYTHON_ENV: &str = "ALGOSCOPE_PYTHON";
pub const TIMEOUT_ENV: &str = "ALGOSCOPE_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for the sandboxed detectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Interpreter used to run generated programs.
    pub python: String,
    /// Wall-clock limit for one sandboxed run.
    pub timeout_ms: u64,
    /// Run with `-I -S`: no user site directory, no site packages.
    pub isolated: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            timeout_ms: 5_000,
            isolated: true,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults, then the optional YAML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides fields from environment variables resolved by `lookup`.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(python) = lookup(PYTHON_ENV) {
            self.python = python;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{TIMEOUT_ENV} must be an integer, got '{raw}'"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.python.trim().is_empty() {
            return Err(ConfigError::Invalid("python must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
