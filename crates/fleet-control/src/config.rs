//! Controller configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How assemblages reach their target clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Package applications are created in the control plane and carry the
    /// cluster credential.
    #[default]
    Direct,
    /// Assemblages are mirrored into each target cluster and compiled there.
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Binding name seeded with the target cluster's name.
    pub cluster_name_binding: String,
    /// Appended to a cluster's name to find its credential.
    pub kubeconfig_suffix: String,
    pub source_interval_secs: u64,
    pub delivery: DeliveryMode,
    pub workers: usize,
    pub max_conflict_retries: usize,
    pub max_requeues: u32,
    pub remote_timeout_ms: u64,
    /// Period of the full re-queue in [`crate::Manager::run`].
    pub resync_interval_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cluster_name_binding: "CLUSTER_NAME".to_string(),
            kubeconfig_suffix: "-kubeconfig".to_string(),
            source_interval_secs: 60,
            delivery: DeliveryMode::Direct,
            workers: 4,
            max_conflict_retries: 5,
            max_requeues: 8,
            remote_timeout_ms: 10_000,
            resync_interval_secs: 300,
        }
    }
}

impl ControllerConfig {
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::ParseToml {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_name_binding.is_empty() {
            return Err(ConfigError::Invalid(
                "cluster_name_binding must not be empty".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.max_conflict_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_conflict_retries must be at least 1".to_string(),
            ));
        }
        if self.resync_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "resync_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Name of the credential for reaching `cluster`.
    pub fn kubeconfig_name(&self, cluster: &str) -> String {
        format!("{cluster}{}", self.kubeconfig_suffix)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}
