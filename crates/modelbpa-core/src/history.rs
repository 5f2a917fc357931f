//! Summaries over previously exported runs.
//!
//! Pure: callers read the records from a store and pass them in.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use modelbpa_types::{ExportRecord, Severity, SeverityCounts};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub run_id: u64,
    pub workspace: String,
    pub dataset: String,
    pub timestamp: String,
    pub violations: u32,
    pub counts: SeverityCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunDelta {
    pub violations: i64,
    pub info: i64,
    pub warning: i64,
    pub error: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HistorySummary {
    pub run_count: u32,
    /// Ascending by run id.
    pub runs: Vec<RunSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_from_previous: Option<RunDelta>,
}

impl HistorySummary {
    pub fn latest(&self) -> Option<&RunSummary> {
        self.runs.last()
    }
}

/// Group `records` by run id, optionally keeping only one dataset.
///
/// Run markers register a run with no violations. Records with an
/// unrecognized severity label count toward the run's violation total but
/// not toward any severity bucket.
pub fn summarize_history(records: &[ExportRecord], dataset: Option<&str>) -> HistorySummary {
    let mut by_run: BTreeMap<u64, RunSummary> = BTreeMap::new();
    for r in records {
        if dataset.is_some_and(|d| d != r.dataset_name) {
            continue;
        }
        let run = by_run.entry(r.run_id).or_insert_with(|| RunSummary {
            run_id: r.run_id,
            workspace: r.workspace_name.clone(),
            dataset: r.dataset_name.clone(),
            timestamp: r.timestamp.clone(),
            violations: 0,
            counts: SeverityCounts::default(),
        });
        if r.is_run_marker() {
            continue;
        }
        run.violations = run.violations.saturating_add(1);
        if let Some(severity) = Severity::from_label(&r.severity) {
            run.counts.bump(severity);
        }
    }

    let runs: Vec<RunSummary> = by_run.into_values().collect();
    let delta_from_previous = match runs.as_slice() {
        [.., prev, curr] => Some(RunDelta {
            violations: i64::from(curr.violations) - i64::from(prev.violations),
            info: i64::from(curr.counts.info) - i64::from(prev.counts.info),
            warning: i64::from(curr.counts.warning) - i64::from(prev.counts.warning),
            error: i64::from(curr.counts.error) - i64::from(prev.counts.error),
        }),
        _ => None,
    };

    HistorySummary {
        run_count: runs.len().min(u32::MAX as usize) as u32,
        runs,
        delta_from_previous,
    }
}
