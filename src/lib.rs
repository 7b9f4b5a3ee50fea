//! # cheatsheet-pdf – export a static page to PDF
//!
//! One run is a short, strictly ordered pipeline:
//!
//! 1. **Serve** – host the pre-built static directory locally ([`host`])
//! 2. **Launch** – start a headless Chromium ([`engine`])
//! 3. **Load** – open a page, pin the viewport, navigate and wait for
//!    network idle ([`page`], [`idle`])
//! 4. **Print** – write the page as a paginated PDF ([`export`])
//!
//! [`pipeline`] sequences the steps and guarantees teardown on every exit
//! path; [`chrome`] wires the real components together.

pub mod chrome;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod host;
pub mod idle;
pub mod page;
pub mod pipeline;
pub mod templates;

// Re-exports for convenience
pub use chrome::generate_pdf;
pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError};
pub use pipeline::{PipelineReport, PipelineState};
