//! Executive report generation.
//!
//! # Submodules
//!
//! - [`report`]: lays out the sections of the report and translates the
//!   model's lightweight markup into styled spans
//! - [`pdf`]: paginates the layout and renders it with `printpdf`
//!
//! The report is offered as `relatorio_executivo_<YYYYMMDD_HHMM>.pdf`.

pub mod pdf;
pub mod report;

use crate::error::ReportError;
use crate::models::ReportRequest;

/// Lay out and render `request` as PDF bytes.
pub fn render_report(request: &ReportRequest, generated_at: &str) -> Result<Vec<u8>, ReportError> {
    if request.analysis.trim().is_empty() {
        return Err(ReportError::NothingToReport);
    }
    let document = report::layout(request, generated_at);
    pdf::render_pdf(&document)
}
