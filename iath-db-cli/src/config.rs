//! Optional `iath.toml` settings.
//!
//! ```toml
//! schemas = "domains.json"
//!
//! [store]
//! match_strategy = "nearest"
//! default_tolerance = 5.0
//!
//! [cache]
//! capacity = 64
//! ```
//!
//! Relative `schemas` paths resolve against the config file's directory.

use crate::error::{CliError, CliResult};
use iath_db::{CacheConfig, DomainRegistry, MatchStrategy, StoreConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "iath.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub schemas: Option<PathBuf>,
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

impl Settings {
    /// Load from `--config`, else `./iath.toml` if it exists, else defaults.
    ///
    /// An explicit path that does not exist is an error; a missing implicit
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        let path = match explicit {
            Some(p) if !p.is_file() => {
                return Err(CliError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            Some(p) => p.to_path_buf(),
            None => {
                let implicit = PathBuf::from(CONFIG_FILE);
                if !implicit.is_file() {
                    return Ok(Self::default());
                }
                implicit
            }
        };
        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut settings = Self::parse(&text)
            .map_err(|msg| CliError::Config(format!("{}: {msg}", path.display())))?;

        if let Some(schemas) = settings.schemas.as_mut() {
            if schemas.is_relative() {
                if let Some(dir) = path.parent() {
                    *schemas = dir.join(&*schemas);
                }
            }
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    fn parse(text: &str) -> Result<Self, String> {
        let settings: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        settings.store.validate().map_err(|e| e.to_string())?;
        settings.cache.validate().map_err(|e| e.to_string())?;
        Ok(settings)
    }

    /// Store config with command-line overrides applied.
    pub fn store_config(
        &self,
        strategy: Option<MatchStrategy>,
        tolerance: Option<f32>,
    ) -> CliResult<StoreConfig> {
        let mut config = self.store.clone();
        if let Some(strategy) = strategy {
            config = config.with_match_strategy(strategy);
        }
        if let Some(tolerance) = tolerance {
            config = config.with_default_tolerance(tolerance);
        }
        config
            .validate()
            .map_err(|e| CliError::Usage(e.to_string()))?;
        Ok(config)
    }

    /// Domain registry from `--schemas` or the configured document.
    pub fn registry(&self, override_path: Option<&Path>) -> CliResult<DomainRegistry> {
        match override_path.or(self.schemas.as_deref()) {
            Some(path) => Ok(DomainRegistry::load(path)?),
            None => Err(CliError::Usage(
                "no domain schemas configured; pass --schemas <file>".into(),
            )),
        }
    }
}
