//! Configuration Loader
//!
//! Layered loading: an optional configuration file (format chosen by extension) followed
//! by `LIMIT_CHECKER__*` environment variables, e.g.
//! `LIMIT_CHECKER__EXECUTION__MAX_CONCURRENT_PROBES=8`.

use super::error::{ConfigResult, ConfigurationError};
use super::CheckerConfig;
use crate::constants::env;
use ::config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded and validated configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CheckerConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from environment variables only
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_layers(None)
    }

    /// Load a configuration file with environment variables layered on top
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::load_error(
                path.display().to_string(),
                "not a readable file",
            ));
        }
        Self::load_layers(Some(path))
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml_str(contents: &str) -> ConfigResult<Arc<ConfigManager>> {
        let config: CheckerConfig = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| ConfigurationError::load_error("inline TOML", e))?;
        Self::finish(config, None)
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn load_layers(path: Option<&Path>) -> ConfigResult<Arc<ConfigManager>> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(env::CONFIG_PREFIX)
                .prefix_separator(env::CONFIG_SEPARATOR)
                .separator(env::CONFIG_SEPARATOR)
                .try_parsing(true),
        );

        let source_name = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());
        let config: CheckerConfig = builder
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| ConfigurationError::load_error(source_name, e))?;

        Self::finish(config, path.map(Path::to_path_buf))
    }

    fn finish(config: CheckerConfig, source: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;

        let source_label = source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string());
        info!(
            source = %source_label,
            warning = config.thresholds.warning,
            critical = config.thresholds.critical,
            limit_overrides = config.limit_overrides.len(),
            threshold_overrides = config.threshold_overrides.len(),
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager { config, source }))
    }
}
