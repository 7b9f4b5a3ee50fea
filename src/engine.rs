//! Render engine driver – a disposable headless Chromium per run.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::PipelineError;

/// A launched browser together with its CDP event loop.
pub struct ChromeEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    // Removed on drop, after the browser has exited.
    _profile: TempDir,
}

impl ChromeEngine {
    /// Start Chromium with a fresh profile directory.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EngineLaunch`] if no executable is found or
    /// the process cannot be started.
    pub async fn launch(config: &EngineConfig) -> Result<Self, PipelineError> {
        let profile = tempfile::Builder::new()
            .prefix("cheatsheet-pdf-profile")
            .tempdir()
            .map_err(|e| PipelineError::EngineLaunch(format!("profile directory: {e}")))?;

        let browser_config = browser_config(config, &profile)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| PipelineError::EngineLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser event error: {e}");
                }
            }
        });

        log::info!("Render engine launched");
        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    /// Open a blank page.
    pub async fn open_page(&self) -> Result<Page, PipelineError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| PipelineError::PageOpen(e.to_string()))
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<(), PipelineError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::EngineClose(e.to_string()));
        if closed.is_err() {
            // Fall back to killing the child so no process outlives the run.
            if let Some(Err(e)) = self.browser.kill().await {
                log::warn!("Failed to kill render engine: {e}");
            }
        }
        let waited = self.browser.wait().await;
        self.handler.abort();
        closed?;
        waited.map_err(|e| PipelineError::EngineClose(e.to_string()))?;
        log::info!("Render engine closed");
        Ok(())
    }
}

/// Close `engine` if one was launched.
pub async fn close_engine(engine: Option<ChromeEngine>) -> Result<(), PipelineError> {
    match engine {
        Some(engine) => engine.close().await,
        None => Ok(()),
    }
}

fn browser_config(config: &EngineConfig, profile: &TempDir) -> Result<BrowserConfig, PipelineError> {
    let mut builder = BrowserConfig::builder()
        .user_data_dir(profile.path())
        .arg("--hide-scrollbars")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync");
    if let Some(executable) = &config.executable {
        builder = builder.chrome_executable(executable);
    }
    if !config.headless {
        builder = builder.with_head();
    }
    if !config.sandbox {
        builder = builder.no_sandbox();
    }
    for arg in &config.args {
        builder = builder.arg(arg.as_str());
    }
    builder
        .build()
        .map_err(|e| PipelineError::EngineLaunch(format!("browser config error: {e}")))
}
