//! Error taxonomy for the export pipeline.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration was rejected before any resource was touched.
    Config,
    /// A step was entered before the step it depends on completed.
    Precondition,
    /// A resource (port, engine process, page) could not be acquired.
    Acquisition,
    /// An operation on an acquired resource failed.
    Operation,
    /// Releasing a resource failed.
    Teardown,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    #[error("failed to start content host on port {port}: {source}")]
    HostStart {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch render engine: {0}")]
    EngineLaunch(String),

    #[error("failed to open page: {0}")]
    PageOpen(String),

    #[error("failed to set viewport: {0}")]
    Viewport(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} did not settle within {limit:?}")]
    NavigationTimeout { url: String, limit: Duration },

    #[error("failed to export document: {0}")]
    Export(String),

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to close render engine: {0}")]
    EngineClose(String),

    #[error("failed to stop content host: {0}")]
    HostStop(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::HostStart { .. } | Self::EngineLaunch(_) | Self::PageOpen(_) => {
                ErrorKind::Acquisition
            }
            Self::Viewport(_)
            | Self::Navigation { .. }
            | Self::NavigationTimeout { .. }
            | Self::Export(_)
            | Self::Write { .. } => ErrorKind::Operation,
            Self::EngineClose(_) | Self::HostStop(_) => ErrorKind::Teardown,
        }
    }
}
