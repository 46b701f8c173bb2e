use std::path::{Path, PathBuf};
use std::sync::Arc;

use bic_runtime::{BrowserToolHost, CdpDriverFactory, RuntimeConfig};

pub struct CliContext {
    config: RuntimeConfig,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: RuntimeConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// A tool host backed by real Chromium sessions.
    pub fn tool_host(&self) -> BrowserToolHost {
        let factory = CdpDriverFactory::new(self.config.driver.clone());
        BrowserToolHost::new(Arc::new(factory)).with_observe_defaults(self.config.observe.clone())
    }
}
