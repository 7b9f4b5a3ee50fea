//! Document exporter – prints the loaded page to a PDF file.

use std::path::Path;

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::page::Page;

use crate::config::ExportConfig;
use crate::error::PipelineError;

/// Every PDF file starts with this signature.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Print request derived from the export configuration. Paper size is
/// given portrait; the engine rotates it when `landscape` is set.
pub fn print_params(config: &ExportConfig) -> Result<PrintToPdfParams, PipelineError> {
    let (paper_width, paper_height) = config.format.size_in_inches();
    let [top, right, bottom, left] = config.margin.to_inches()?;
    Ok(PrintToPdfParams::builder()
        .landscape(config.landscape())
        .print_background(config.print_background)
        .scale(config.scale)
        .paper_width(paper_width)
        .paper_height(paper_height)
        .margin_top(top)
        .margin_right(right)
        .margin_bottom(bottom)
        .margin_left(left)
        .build())
}

/// Print `page` and write the document to `config.output_path`,
/// overwriting any existing file. Returns the number of bytes written.
pub async fn export(page: &Page, config: &ExportConfig) -> Result<u64, PipelineError> {
    let params = print_params(config)?;
    let bytes = page
        .pdf(params)
        .await
        .map_err(|e| PipelineError::Export(e.to_string()))?;
    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(PipelineError::Export(
            "engine returned data without a PDF signature".to_string(),
        ));
    }
    write_document(&config.output_path, &bytes).await?;
    log::info!(
        "Wrote '{}' ({} bytes)",
        config.output_path.display(),
        bytes.len()
    );
    Ok(bytes.len() as u64)
}

/// Write `bytes` to `path`, creating the parent directory if necessary.
pub async fn write_document(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }
    tokio::fs::write(path, bytes).await.map_err(write_err)
}
