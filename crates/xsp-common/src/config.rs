//! ---
//! xsp_section: "01-core-functionality"
//! xsp_subsection: "module"
//! xsp_type: "source"
//! xsp_scope: "code"
//! xsp_description: "Shared configuration and logging utilities."
//! xsp_version: "v0.1.0"
//! xsp_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_in_memory() -> bool {
    true
}

fn default_metrics_enabled() -> bool {
    true
}

/// Logging section of the pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving rolling log files.
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    /// Optional file prefix; defaults to the service name.
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Stdout log format.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            file_prefix: None,
            format: default_log_format(),
        }
    }
}

/// Bus wiring section of the pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Use the in-memory transport (tests and single-process integration).
    #[serde(default = "default_in_memory")]
    pub in_memory_enabled: bool,
    /// Register Prometheus metrics for the consumer gate.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            in_memory_enabled: true,
            metrics_enabled: true,
        }
    }
}

/// Top-level configuration for a pipeline service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Logging section.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Bus section.
    #[serde(default)]
    pub bus: BusConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        debug!(path = %path.display(), "pipeline configuration loaded");
        Ok(config)
    }
}
