//! JSON-lines result store: one [`ExportRecord`] per line, appended per run.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use modelbpa_core::{ResultStore, StoreError};
use modelbpa_types::ExportRecord;

#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored record; an absent file reads as empty.
    pub fn read_all(&self) -> Result<Vec<ExportRecord>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| StoreError::Malformed {
                line: i + 1,
                message: e.to_string(),
            })?;
            out.push(record);
        }
        debug!("Read {} record(s) from '{}'", out.len(), self.path.display());
        Ok(out)
    }
}

impl ResultStore for JsonlStore {
    fn max_run_id(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.read_all()?.iter().map(|r| r.run_id).max())
    }

    fn append(&mut self, records: &[ExportRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut w = BufWriter::new(file);
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            writeln!(w, "{line}")?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(run_id: u64) -> ExportRecord {
        ExportRecord {
            workspace_name: "W".to_string(),
            dataset_name: "D".to_string(),
            category: "Performance".to_string(),
            rule_name: "r".to_string(),
            severity: "Warning".to_string(),
            object_type: "Column".to_string(),
            object_name: "T[c]".to_string(),
            description: String::new(),
            url: None,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            run_id,
        }
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let td = TempDir::new().unwrap();
        let store = JsonlStore::new(td.path().join("results.jsonl"));
        assert_eq!(store.max_run_id().unwrap(), None);
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn append_then_read_back() {
        let td = TempDir::new().unwrap();
        let mut store = JsonlStore::new(td.path().join("nested/results.jsonl"));
        store.append(&[record(1), record(1)]).unwrap();
        store.append(&[record(2)]).unwrap();

        assert_eq!(store.read_all().unwrap().len(), 3);
        assert_eq!(store.max_run_id().unwrap(), Some(2));
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("results.jsonl");
        let good = serde_json::to_string(&record(1)).unwrap();
        std::fs::write(&path, format!("{good}\n\nnot json\n")).unwrap();

        let err = JsonlStore::new(&path).read_all().unwrap_err();
        assert!(matches!(err, StoreError::Malformed { line: 3, .. }));
    }
}
