//! Renderer-independent tab model of a report.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use modelbpa_types::{CategoryGroup, ReportRow, Severity, SeverityCounts};

/// One tab per non-empty category. Exactly one tab is active when any exist.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportDocument {
    pub tabs: Vec<Tab>,
}

impl ReportDocument {
    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.active)
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Tab {
    /// DOM id, unique within the document.
    pub id: String,
    pub category: String,
    /// Category followed by the severity summary.
    pub label: String,
    pub summary: String,
    pub active: bool,
    pub rows: Vec<ReportRow>,
}

/// Build the tab model. Groups without rows do not become tabs.
pub fn build_document(groups: &[CategoryGroup]) -> ReportDocument {
    let tabs = groups
        .iter()
        .filter(|g| !g.rows.is_empty())
        .enumerate()
        .map(|(i, g)| {
            let summary = tab_summary(&g.severity_counts);
            let label = if summary.is_empty() {
                g.category.clone()
            } else {
                format!("{} ({summary})", g.category)
            };
            Tab {
                id: format!("tab-{i}"),
                category: g.category.clone(),
                label,
                summary,
                active: i == 0,
                rows: g.rows.clone(),
            }
        })
        .collect();
    ReportDocument { tabs }
}

/// "3 × Error + 2 × Warning": most severe first, zero counts omitted.
pub fn tab_summary(counts: &SeverityCounts) -> String {
    Severity::ALL
        .into_iter()
        .filter_map(|s| match counts.get(s) {
            0 => None,
            n => Some(format!("{n} \u{d7} {}", s.label())),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}
