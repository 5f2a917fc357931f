//! Core engine: orchestrates rule evaluation + report assembly + rendering.

mod analyze;
mod assemble;
mod csv;
mod document;
mod export;
mod history;
mod html;
mod render;

pub use analyze::{AnalysisError, AnalysisPlan, AnalysisRun, run_analysis};
pub use assemble::{Assembly, assemble, group_by_category, localize};
pub use csv::{render_csv, render_tsv};
pub use document::{ReportDocument, Tab, build_document, tab_summary};
pub use export::{
    ExportContext, ExportError, ExportSummary, ResultStore, StoreError, export_rows, next_run_id,
    to_export_records,
};
pub use history::{HistorySummary, RunDelta, RunSummary, summarize_history};
pub use html::render_html;
pub use render::render_markdown_for_report;
