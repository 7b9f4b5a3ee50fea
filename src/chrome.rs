//! Chromium-backed pipeline stages.

use async_trait::async_trait;
use chromiumoxide::page::Page;

use crate::config::{
    EngineConfig, ExportConfig, NavigationConfig, PipelineConfig, ServerConfig, ViewportConfig,
};
use crate::engine::{self, ChromeEngine};
use crate::error::PipelineError;
use crate::export;
use crate::host::StaticHost;
use crate::page;
use crate::pipeline::{self, PipelineReport, Stages};

/// Static host + headless Chromium.
pub struct ChromeStages {
    engine: EngineConfig,
}

impl ChromeStages {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Stages for ChromeStages {
    type Host = StaticHost;
    type Engine = ChromeEngine;
    type Page = Page;

    async fn start_host(&mut self, server: &ServerConfig) -> Result<StaticHost, PipelineError> {
        StaticHost::start(server).await
    }

    fn origin(&self, host: &StaticHost) -> String {
        host.origin()
    }

    async fn launch_engine(&mut self) -> Result<ChromeEngine, PipelineError> {
        ChromeEngine::launch(&self.engine).await
    }

    async fn open_page(&mut self, engine: &ChromeEngine) -> Result<Page, PipelineError> {
        engine.open_page().await
    }

    async fn set_viewport(
        &mut self,
        page: &Page,
        viewport: &ViewportConfig,
    ) -> Result<(), PipelineError> {
        page::set_viewport(page, viewport).await
    }

    async fn navigate(
        &mut self,
        page: &Page,
        url: &str,
        navigation: &NavigationConfig,
    ) -> Result<(), PipelineError> {
        page::navigate(page, url, navigation).await
    }

    async fn export(&mut self, page: &Page, config: &ExportConfig) -> Result<u64, PipelineError> {
        export::export(page, config).await
    }

    async fn close_engine(&mut self, engine: Option<ChromeEngine>) -> Result<(), PipelineError> {
        engine::close_engine(engine).await
    }

    async fn stop_host(&mut self, mut host: StaticHost) -> Result<(), PipelineError> {
        host.stop().await
    }
}

/// Serve `config.server.static_dir`, render it in headless Chromium and
/// write the PDF to `config.export.output_path`.
pub async fn generate_pdf(config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    pipeline::run(ChromeStages::new(config.engine.clone()), config).await
}
