//! Configuration records for one export run.
//!
//! All records are plain immutable values built once at startup. The
//! defaults reproduce the cheat sheet export: port 3000 serving `dist`,
//! a 1123×794 viewport at 2× (A4 landscape at 96 DPI), and an A4 landscape
//! PDF with 15px margins printed at 0.7 scale.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Static content host parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port to listen on. `0` lets the OS pick one.
    pub port: u16,
    /// Directory whose files are served at `/`.
    pub static_dir: PathBuf,
    /// Interface to bind (default: loopback).
    pub bind: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("dist"),
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

/// Virtual rendering surface, in device-independent pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        // A4 landscape at 96 DPI
        Self {
            width: 1123,
            height: 794,
            device_scale_factor: 2.0,
        }
    }
}

/// Standard paper sizes accepted by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PageFormat {
    /// Paper `(width, height)` in inches, portrait.
    pub fn size_in_inches(self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
            Self::Tabloid => (11.0, 17.0),
            Self::Ledger => (17.0, 11.0),
            Self::A0 => (33.1, 46.8),
            Self::A1 => (23.4, 33.1),
            Self::A2 => (16.54, 23.4),
            Self::A3 => (11.7, 16.54),
            Self::A4 => (8.27, 11.7),
            Self::A5 => (5.83, 8.27),
            Self::A6 => (4.13, 5.83),
        }
    }
}

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    /// Landscape mode: width > height (default for the cheat sheet).
    #[default]
    Landscape,
}

/// Four-sided page margin as CSS-like length strings (`"15px"`, `"1cm"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Margin {
    /// The same length on every side.
    pub fn uniform(length: &str) -> Self {
        Self {
            top: length.to_string(),
            right: length.to_string(),
            bottom: length.to_string(),
            left: length.to_string(),
        }
    }

    /// `[top, right, bottom, left]` converted to inches.
    pub fn to_inches(&self) -> Result<[f64; 4], PipelineError> {
        Ok([
            length_to_inches(&self.top)?,
            length_to_inches(&self.right)?,
            length_to_inches(&self.bottom)?,
            length_to_inches(&self.left)?,
        ])
    }
}

impl Default for Margin {
    fn default() -> Self {
        Self::uniform("15px")
    }
}

/// Target document parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_path: PathBuf,
    pub format: PageFormat,
    pub orientation: Orientation,
    pub margin: Margin,
    /// Content scale, fit-to-page (engine accepts 0.1 to 2.0).
    pub scale: f64,
    pub print_background: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("generated/tailwind-flexbox-cheatsheet.pdf"),
            format: PageFormat::A4,
            orientation: Orientation::Landscape,
            margin: Margin::default(),
            scale: 0.7,
            print_background: true,
        }
    }
}

impl ExportConfig {
    pub fn landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }
}

/// How the render engine process is started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chromium executable; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Disable with care: only for containers that cannot run the sandbox.
    pub sandbox: bool,
    /// Extra command-line switches passed to the engine.
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            sandbox: true,
            args: Vec::new(),
        }
    }
}

/// Navigation completion condition, named after the page lifecycle event
/// that satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitUntil {
    DomContentLoaded,
    Load,
    /// At most two requests in flight for 500 ms.
    NetworkAlmostIdle,
    /// No requests in flight for 500 ms.
    #[default]
    NetworkIdle,
}

impl WaitUntil {
    pub fn lifecycle_event(self) -> &'static str {
        match self {
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Load => "load",
            Self::NetworkAlmostIdle => "networkAlmostIdle",
            Self::NetworkIdle => "networkIdle",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub wait_until: WaitUntil,
    /// Upper bound on navigation plus settling. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl NavigationConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub server: ServerConfig,
    pub viewport: ViewportConfig,
    pub export: ExportConfig,
    pub engine: EngineConfig,
    pub navigation: NavigationConfig,
}

impl PipelineConfig {
    /// Reject values the engine would refuse or that make the run pointless.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let vp = &self.viewport;
        if vp.width == 0 || vp.height == 0 {
            return Err(PipelineError::Config(format!(
                "viewport must be non-empty, got {}x{}",
                vp.width, vp.height
            )));
        }
        if vp.device_scale_factor.is_nan() || vp.device_scale_factor <= 0.0 {
            return Err(PipelineError::Config(format!(
                "device scale factor must be positive, got {}",
                vp.device_scale_factor
            )));
        }
        if !(0.1..=2.0).contains(&self.export.scale) {
            return Err(PipelineError::Config(format!(
                "print scale must be between 0.1 and 2.0, got {}",
                self.export.scale
            )));
        }
        if self.export.output_path.as_os_str().is_empty() {
            return Err(PipelineError::Config("output path is empty".to_string()));
        }
        self.export.margin.to_inches()?;
        if self.navigation.timeout_secs == Some(0) {
            return Err(PipelineError::Config(
                "navigation timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))
    }
}

/// Convert a length string to inches. Bare numbers are pixels.
pub fn length_to_inches(length: &str) -> Result<f64, PipelineError> {
    let text = length.trim().to_ascii_lowercase();
    let (number, per_inch) = if let Some(n) = text.strip_suffix("px") {
        (n, 96.0)
    } else if let Some(n) = text.strip_suffix("in") {
        (n, 1.0)
    } else if let Some(n) = text.strip_suffix("cm") {
        (n, 2.54)
    } else if let Some(n) = text.strip_suffix("mm") {
        (n, 25.4)
    } else {
        (text.as_str(), 96.0)
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("unrecognised length '{length}'")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(PipelineError::Config(format!(
            "length must be a non-negative number, got '{length}'"
        )));
    }
    Ok(value / per_inch)
}
