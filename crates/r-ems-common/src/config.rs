//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the SNMP integration runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

/// Environment variable that overrides configuration discovery.
pub const ENV_CONFIG_PATH: &str = "R_EMS_CONFIG";

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// A configuration document that can be checked for structural invariants
/// after deserialisation.
pub trait ConfigDocument: DeserializeOwned {
    /// Validate structural invariants.
    fn validate(&self) -> Result<()>;
}

/// Metadata describing where a configuration document was loaded from.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub config: T,
    pub source: PathBuf,
}

/// Load a configuration document from disk, respecting the `R_EMS_CONFIG` override.
pub fn load<T: ConfigDocument, P: AsRef<Path>>(candidates: &[P]) -> Result<T> {
    Ok(load_with_source(candidates)?.config)
}

/// Load a configuration document together with the effective source path.
///
/// A non-empty `R_EMS_CONFIG` wins over the candidate list; otherwise the
/// first candidate that exists is used.
pub fn load_with_source<T: ConfigDocument, P: AsRef<Path>>(candidates: &[P]) -> Result<Loaded<T>> {
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        if !env_path.trim().is_empty() {
            let path = PathBuf::from(env_path);
            let config = from_path(&path)?;
            return Ok(Loaded {
                config,
                source: path,
            });
        }
    }

    for candidate in candidates {
        if candidate.as_ref().exists() {
            let path = candidate.as_ref().to_path_buf();
            let config = from_path(&path)?;
            return Ok(Loaded {
                config,
                source: path,
            });
        }
    }

    Err(anyhow!(
        "no configuration files found. inspected: {}",
        candidates
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

/// Parse and validate a TOML document held in memory.
pub fn parse_document<T: ConfigDocument>(content: &str) -> Result<T> {
    let config: T = toml::from_str(content).with_context(|| "failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

fn from_path<T: ConfigDocument>(path: &Path) -> Result<T> {
    debug!(config_path = %path.display(), "loading configuration");
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    let config = toml::from_str::<T>(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

/// Tracing output settings.
///
/// When `directory` is unset only the stdout layer is installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
