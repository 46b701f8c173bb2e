use std::sync::Arc;

use async_trait::async_trait;
use bic_browser_driver::{BrowserDriver, CdpConfig, CdpDriver, DriverResult, LaunchOptions};
use tracing::info;

/// Creates the driver a new session will own.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self, options: LaunchOptions) -> DriverResult<Arc<dyn BrowserDriver>>;
}

/// Launches (or attaches to) Chromium for every session.
#[derive(Clone, Debug)]
pub struct CdpDriverFactory {
    config: CdpConfig,
}

impl CdpDriverFactory {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.config
    }
}

#[async_trait]
impl DriverFactory for CdpDriverFactory {
    async fn open(&self, options: LaunchOptions) -> DriverResult<Arc<dyn BrowserDriver>> {
        info!(url = %options.url, headless = ?options.headless, "launching browser session");
        let driver = CdpDriver::launch(self.config.clone(), options).await?;
        Ok(Arc::new(driver))
    }
}
