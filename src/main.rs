//! cheatsheet-pdf – serve the built cheat sheet and export it to PDF.
//!
//! Usage:
//!   cheatsheet-pdf [--config overrides.json] [--output out.pdf] [--static-dir dist]
//!
//! With no arguments the compiled-in defaults are used: `dist` served on
//! port 3000, written to `generated/tailwind-flexbox-cheatsheet.pdf`.

use std::path::PathBuf;
use std::{fs, process};

use clap::Parser;

use cheatsheet_pdf::config::PipelineConfig;
use cheatsheet_pdf::generate_pdf;

#[derive(Debug, Parser)]
#[command(name = "cheatsheet-pdf", version, about = "Export a static page to PDF")]
struct Cli {
    /// JSON file with configuration overrides; absent fields keep defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output PDF path
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Directory of pre-built static files to serve
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,

    /// Local port for the static file server
    #[arg(long)]
    port: Option<u16>,

    /// Chromium executable (auto-detected by default)
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Run the browser without its sandbox
    #[arg(long)]
    no_sandbox: bool,

    /// Give up if the page has not settled after this many seconds
    #[arg(long, value_name = "SECS")]
    navigation_timeout: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .map_err(|e| format!("Error reading '{}': {e}", path.display()))?;
                PipelineConfig::from_json(&json).map_err(|e| e.to_string())?
            }
            None => PipelineConfig::default(),
        };
        if let Some(output) = self.output {
            config.export.output_path = output;
        }
        if let Some(dir) = self.static_dir {
            config.server.static_dir = dir;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(chrome) = self.chrome {
            config.engine.executable = Some(chrome);
        }
        if self.no_sandbox {
            config.engine.sandbox = false;
        }
        if self.navigation_timeout.is_some() {
            config.navigation.timeout_secs = self.navigation_timeout;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let print_config = cli.print_config;
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    if print_config {
        println!("{}", config.to_json());
        return;
    }

    match generate_pdf(&config).await {
        Ok(report) => {
            if !report.teardown_failures.is_empty() {
                log::warn!(
                    "{} resource(s) were not released cleanly",
                    report.teardown_failures.len()
                );
            }
            println!("PDF generated successfully!");
        }
        Err(e) => {
            eprintln!("Failed to generate PDF: {e}");
            process::exit(1);
        }
    }
}
