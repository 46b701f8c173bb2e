//! Runtime configuration.
//!
//! Loaded from YAML (`--config`, `./config/bic.yaml`, then the user config dir), with
//! `BIC_*` environment overrides applied on top of whatever the file said.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bic_browser_driver::CdpConfig;
use bic_contract::{ObserveScope, DEFAULT_MAX_AFFORDANCES, MAX_AFFORDANCES, MIN_AFFORDANCES};
use bic_perceiver::ObserveOptions;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const LOCAL_CONFIG_PATH: &str = "config/bic.yaml";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub driver: CdpConfig,
    pub observe: ObserveDefaults,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            driver: CdpConfig::default(),
            observe: ObserveDefaults::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Observe options used when a caller leaves them out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserveDefaults {
    pub scope: ObserveScope,
    pub max_affordances: usize,
    pub include_hidden: bool,
    pub include_disabled: bool,
}

impl Default for ObserveDefaults {
    fn default() -> Self {
        Self {
            scope: ObserveScope::Document,
            max_affordances: DEFAULT_MAX_AFFORDANCES,
            include_hidden: false,
            include_disabled: true,
        }
    }
}

impl ObserveDefaults {
    pub fn to_options(&self) -> ObserveOptions {
        ObserveOptions {
            scope: self.scope,
            max_affordances: self.max_affordances.clamp(MIN_AFFORDANCES, MAX_AFFORDANCES),
            include_hidden: self.include_hidden,
            include_disabled: self.include_disabled,
            ..ObserveOptions::default()
        }
    }
}

pub struct LoadedConfig {
    pub config: RuntimeConfig,
    pub path: PathBuf,
}

/// Picks the config path: explicit, local, then `<config_dir>/bic/config.yaml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(LOCAL_CONFIG_PATH);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(mut path) => {
            path.push("bic");
            path.push("config.yaml");
            path
        }
        None => local,
    }
}

pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = resolve_config_path(explicit);

    let mut config = if path.exists() {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: RuntimeConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        warn!(path = %path.display(), "Config file not found, using defaults");
        RuntimeConfig::default()
    };

    config.driver.apply_env_overrides();
    Ok(LoadedConfig { config, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn loads_partial_yaml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "log_level: debug\nobserve:\n  scope: modal\n  max_affordances: 500\ndriver:\n  navigation_timeout_ms: 5000\n"
        )
        .unwrap();

        let loaded = load_config(Some(file.path())).await.unwrap();
        assert_eq!(loaded.path, file.path());
        assert_eq!(loaded.config.log_level, "debug");
        assert_eq!(loaded.config.observe.scope, ObserveScope::Modal);
        assert!(loaded.config.observe.include_disabled);
        assert_eq!(loaded.config.driver.navigation_timeout_ms, 5000);
        assert_eq!(loaded.config.driver.heartbeat_interval_ms, 15_000);

        let options = loaded.config.observe.to_options();
        assert_eq!(options.max_affordances, MAX_AFFORDANCES);
        assert_eq!(options.scope, ObserveScope::Modal);
    }

    #[tokio::test]
    async fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.config.observe, ObserveDefaults::default());
        assert_eq!(loaded.config.log_level, "info");
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "observe: [not, a, map]").unwrap();
        assert!(load_config(Some(file.path())).await.is_err());
    }
}
