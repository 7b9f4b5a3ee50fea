//! Pipeline – ties together the content host, render engine, page
//! controller and exporter into a single run with guaranteed teardown.
//!
//! The steps are strictly sequential:
//!
//! ```text
//! Idle → HostStarted → EngineLaunched → PageOpened → PageConfigured
//!      → Navigated → Exported → TornDown
//! ```
//!
//! Any failure stops forward progress. Teardown (close engine, then stop
//! host) runs once from the single exit point in [`run`], whatever the
//! outcome.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::{ExportConfig, NavigationConfig, PipelineConfig, ServerConfig, ViewportConfig};
use crate::error::PipelineError;

/// The component calls a pipeline is made of. The Chromium implementation
/// lives in [`crate::chrome`]; tests substitute recording fakes.
#[async_trait]
pub trait Stages: Send {
    type Host: Send;
    type Engine: Send + Sync;
    type Page: Send + Sync;

    async fn start_host(&mut self, server: &ServerConfig) -> Result<Self::Host, PipelineError>;

    /// URL the render engine should load from `host`.
    fn origin(&self, host: &Self::Host) -> String;

    async fn launch_engine(&mut self) -> Result<Self::Engine, PipelineError>;

    async fn open_page(&mut self, engine: &Self::Engine) -> Result<Self::Page, PipelineError>;

    async fn set_viewport(
        &mut self,
        page: &Self::Page,
        viewport: &ViewportConfig,
    ) -> Result<(), PipelineError>;

    async fn navigate(
        &mut self,
        page: &Self::Page,
        url: &str,
        navigation: &NavigationConfig,
    ) -> Result<(), PipelineError>;

    /// Returns the number of bytes written.
    async fn export(
        &mut self,
        page: &Self::Page,
        export: &ExportConfig,
    ) -> Result<u64, PipelineError>;

    /// Must be a no-op for `None`.
    async fn close_engine(&mut self, engine: Option<Self::Engine>) -> Result<(), PipelineError>;

    async fn stop_host(&mut self, host: Self::Host) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    HostStarted,
    EngineLaunched,
    PageOpened,
    PageConfigured,
    Navigated,
    Exported,
    TornDown,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct PipelineReport {
    pub output_path: PathBuf,
    pub bytes_written: u64,
    /// Release failures; logged, never turned into a run failure.
    pub teardown_failures: Vec<PipelineError>,
}

/// The live resources of one run.
pub struct Session<S: Stages> {
    stages: S,
    host: Option<S::Host>,
    engine: Option<S::Engine>,
    page: Option<S::Page>,
    origin: Option<String>,
    state: PipelineState,
}

impl<S: Stages> Session<S> {
    pub fn new(stages: S) -> Self {
        Self {
            stages,
            host: None,
            engine: None,
            page: None,
            origin: None,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn require(&self, state: PipelineState, what: &'static str) -> Result<(), PipelineError> {
        if self.state == state {
            Ok(())
        } else {
            Err(PipelineError::Precondition(what))
        }
    }

    fn advance(&mut self, state: PipelineState) {
        log::debug!("pipeline: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub async fn start_host(&mut self, server: &ServerConfig) -> Result<(), PipelineError> {
        self.require(PipelineState::Idle, "content host already started")?;
        let host = self.stages.start_host(server).await?;
        self.origin = Some(self.stages.origin(&host));
        self.host = Some(host);
        self.advance(PipelineState::HostStarted);
        Ok(())
    }

    pub async fn launch_engine(&mut self) -> Result<(), PipelineError> {
        self.require(
            PipelineState::HostStarted,
            "render engine must be launched once, after the content host",
        )?;
        let engine = self.stages.launch_engine().await?;
        self.engine = Some(engine);
        self.advance(PipelineState::EngineLaunched);
        Ok(())
    }

    pub async fn open_page(&mut self) -> Result<(), PipelineError> {
        let Some(engine) = self.engine.as_ref() else {
            return Err(PipelineError::Precondition("render engine has not been launched"));
        };
        if self.page.is_some() {
            return Err(PipelineError::Precondition("page already open"));
        }
        let page = self.stages.open_page(engine).await?;
        self.page = Some(page);
        self.advance(PipelineState::PageOpened);
        Ok(())
    }

    pub async fn set_viewport(&mut self, viewport: &ViewportConfig) -> Result<(), PipelineError> {
        self.require(PipelineState::PageOpened, "no freshly opened page to configure")?;
        let page = self
            .page
            .as_ref()
            .ok_or(PipelineError::Precondition("page has not been opened"))?;
        self.stages.set_viewport(page, viewport).await?;
        self.advance(PipelineState::PageConfigured);
        Ok(())
    }

    pub async fn navigate(&mut self, navigation: &NavigationConfig) -> Result<(), PipelineError> {
        self.require(
            PipelineState::PageConfigured,
            "page must be configured before navigation",
        )?;
        let (Some(page), Some(origin)) = (self.page.as_ref(), self.origin.as_deref()) else {
            return Err(PipelineError::Precondition("page or content host missing"));
        };
        self.stages.navigate(page, origin, navigation).await?;
        self.advance(PipelineState::Navigated);
        Ok(())
    }

    pub async fn export(&mut self, export: &ExportConfig) -> Result<u64, PipelineError> {
        self.require(
            PipelineState::Navigated,
            "page must finish navigating before export",
        )?;
        let page = self
            .page
            .as_ref()
            .ok_or(PipelineError::Precondition("page has not been opened"))?;
        let written = self.stages.export(page, export).await?;
        self.advance(PipelineState::Exported);
        Ok(written)
    }

    async fn drive(&mut self, config: &PipelineConfig) -> Result<u64, PipelineError> {
        self.start_host(&config.server).await?;
        self.launch_engine().await?;
        self.open_page().await?;
        self.set_viewport(&config.viewport).await?;
        self.navigate(&config.navigation).await?;
        self.export(&config.export).await
    }

    /// Release everything acquired so far, in reverse order: page, render
    /// engine, content host. Runs at most once; later calls return nothing.
    pub async fn teardown(&mut self) -> Vec<PipelineError> {
        if self.state == PipelineState::TornDown {
            return Vec::new();
        }
        let mut failures = Vec::new();

        self.page = None;
        if let Err(err) = self.stages.close_engine(self.engine.take()).await {
            log::error!("Teardown: {err}");
            failures.push(err);
        }
        if let Some(host) = self.host.take() {
            if let Err(err) = self.stages.stop_host(host).await {
                log::error!("Teardown: {err}");
                failures.push(err);
            }
        }

        self.advance(PipelineState::TornDown);
        failures
    }
}

/// Run the whole pipeline once.
///
/// The configuration is validated before anything is acquired. On failure
/// the error of the failing step is returned after teardown has completed.
pub async fn run<S: Stages>(
    stages: S,
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineError> {
    config.validate()?;

    let mut session = Session::new(stages);
    let outcome = session.drive(config).await;
    if let Err(err) = &outcome {
        log::error!("Error generating PDF: {err}");
    }

    let teardown_failures = session.teardown().await;
    let bytes_written = outcome?;

    Ok(PipelineReport {
        output_path: config.export.output_path.clone(),
        bytes_written,
        teardown_failures,
    })
}
