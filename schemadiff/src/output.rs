//! Report rendering and output.
//!
//! Text reports are written verbatim so they can be piped straight into
//! `psql`. JSON reports carry the per-type segments and any failure.

use schemadiff_core::{DiffReport, Result, SchemaDiffError};
use std::io::Write;
use std::path::Path;

use crate::ReportFormat;

/// Renders a report in the requested format.
///
/// # Errors
/// Returns a serialization error if the JSON encoding fails.
pub fn render_report(report: &DiffReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(report.text().to_string()),
        ReportFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(report).map_err(|e| SchemaDiffError::Serialization {
                    context: "diff report".to_string(),
                    source: e,
                })?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Writes a rendered report to `output_path`, or to stdout when absent.
///
/// # Errors
/// Returns an I/O error if the file or stdout cannot be written.
pub async fn write_report(
    report: &DiffReport,
    format: ReportFormat,
    output_path: Option<&Path>,
) -> Result<()> {
    let rendered = render_report(report, format)?;

    match output_path {
        Some(path) => {
            tokio::fs::write(path, rendered.as_bytes())
                .await
                .map_err(|e| SchemaDiffError::Io {
                    context: format!("Failed to write to {}", path.display()),
                    source: e,
                })?;
            tracing::info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| SchemaDiffError::Io {
                    context: "Failed to write to stdout".to_string(),
                    source: e,
                })?;
        }
    }
    Ok(())
}
