//! Formatting of report rows for the historical results store.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use modelbpa_types::{ExportRecord, ReportRow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("result store record {line} is malformed: {message}")]
    Malformed { line: usize, message: String },

    #[error("result store rejected the write: {0}")]
    Rejected(String),
}

/// Append-only table of export records, one batch per run.
pub trait ResultStore {
    /// Highest run id in the store, `None` when it is empty.
    fn max_run_id(&self) -> Result<Option<u64>, StoreError>;

    fn append(&mut self, records: &[ExportRecord]) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export requested but no result store is configured")]
    NoTarget,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportContext {
    pub workspace: String,
    pub dataset: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub run_id: u64,
    /// Rows exported. A clean run writes a single run marker and reports 0.
    pub records_written: usize,
}

/// One record per row, all stamped with the same run id and timestamp.
pub fn to_export_records(rows: &[ReportRow], ctx: &ExportContext, run_id: u64) -> Vec<ExportRecord> {
    let timestamp = ctx.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    rows.iter()
        .map(|row| ExportRecord {
            workspace_name: ctx.workspace.clone(),
            dataset_name: ctx.dataset.clone(),
            category: row.category.clone(),
            rule_name: row.rule_name.clone(),
            severity: row.severity.label().to_string(),
            object_type: row.object_type.as_str().to_string(),
            object_name: row.object_name.clone(),
            description: row.description.clone(),
            url: row.url.clone(),
            timestamp: timestamp.clone(),
            run_id,
        })
        .collect()
}

/// 1 for an empty store, otherwise one past the highest stored run id.
pub fn next_run_id(max_run_id: Option<u64>) -> u64 {
    max_run_id.map_or(1, |max| max.saturating_add(1))
}

/// Append `rows` to `store` as a new run.
///
/// A run without rows is persisted as one [`ExportRecord::run_marker`], so
/// every export consumes a fresh run id. Fails with [`ExportError::NoTarget`]
/// before touching anything when no store is given.
pub fn export_rows(
    rows: &[ReportRow],
    ctx: &ExportContext,
    store: Option<&mut dyn ResultStore>,
) -> Result<ExportSummary, ExportError> {
    let store = store.ok_or(ExportError::NoTarget)?;
    let run_id = next_run_id(store.max_run_id()?);
    let records = if rows.is_empty() {
        vec![ExportRecord::run_marker(
            ctx.workspace.clone(),
            ctx.dataset.clone(),
            ctx.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            run_id,
        )]
    } else {
        to_export_records(rows, ctx, run_id)
    };
    store.append(&records)?;
    info!(
        "Exported {} row(s) for '{}' as run {}",
        rows.len(),
        ctx.dataset,
        run_id
    );
    Ok(ExportSummary {
        run_id,
        records_written: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use modelbpa_types::{ScopeName, Severity};

    #[derive(Default)]
    struct MemoryStore {
        records: Vec<ExportRecord>,
    }

    impl ResultStore for MemoryStore {
        fn max_run_id(&self) -> Result<Option<u64>, StoreError> {
            Ok(self.records.iter().map(|r| r.run_id).max())
        }

        fn append(&mut self, records: &[ExportRecord]) -> Result<(), StoreError> {
            self.records.extend_from_slice(records);
            Ok(())
        }
    }

    fn ctx() -> ExportContext {
        ExportContext {
            workspace: "Finance".to_string(),
            dataset: "Sales".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        }
    }

    fn rows() -> Vec<ReportRow> {
        vec![ReportRow {
            category: "Performance".to_string(),
            rule_name: "Avoid floats".to_string(),
            severity: Severity::Error,
            object_type: ScopeName::RowLevelSecurity,
            object_name: "Readers[Table1]".to_string(),
            description: "d".to_string(),
            url: None,
        }]
    }

    #[test]
    fn records_use_labels_and_display_names() {
        let records = to_export_records(&rows(), &ctx(), 7);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.severity, "Error");
        assert_eq!(r.object_type, "Row Level Security");
        assert_eq!(r.timestamp, "2024-03-01T12:30:00Z");
        assert_eq!(r.run_id, 7);
        assert_eq!(r.workspace_name, "Finance");

        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["Rule_Name"], "Avoid floats");
        assert_eq!(json["RunId"], 7);
    }

    #[test]
    fn run_ids_increment() {
        assert_eq!(next_run_id(None), 1);
        assert_eq!(next_run_id(Some(41)), 42);

        let mut store = MemoryStore::default();
        let first = export_rows(&rows(), &ctx(), Some(&mut store)).unwrap();
        let second = export_rows(&rows(), &ctx(), Some(&mut store)).unwrap();
        assert_eq!(first.run_id, 1);
        assert_eq!(second.run_id, 2);
        assert_eq!(store.records.len(), 2);
    }

    #[test]
    fn clean_runs_still_consume_run_ids() {
        let mut store = MemoryStore::default();
        let first = export_rows(&[], &ctx(), Some(&mut store)).unwrap();
        let second = export_rows(&[], &ctx(), Some(&mut store)).unwrap();
        assert_eq!(first.run_id, 1);
        assert_eq!(second.run_id, 2);
        assert_eq!(first.records_written, 0);

        assert_eq!(store.records.len(), 2);
        assert!(store.records.iter().all(ExportRecord::is_run_marker));
        assert_eq!(store.records[1].dataset_name, "Sales");
        assert_eq!(store.records[1].timestamp, "2024-03-01T12:30:00Z");

        let third = export_rows(&rows(), &ctx(), Some(&mut store)).unwrap();
        assert_eq!(third.run_id, 3);
    }

    #[test]
    fn missing_store_fails_up_front() {
        let err = export_rows(&rows(), &ctx(), None).unwrap_err();
        assert!(matches!(err, ExportError::NoTarget));
    }
}
