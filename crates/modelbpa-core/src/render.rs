use modelbpa_types::{AnalysisReport, CategoryGroup, ReportRow, VerdictStatus};

use crate::document::tab_summary;

/// Markdown report: a header with totals, then one section per category.
pub fn render_markdown_for_report(report: &AnalysisReport, groups: &[CategoryGroup]) -> String {
    let status = match report.status {
        VerdictStatus::Pass => "PASS",
        VerdictStatus::Warn => "WARN",
        VerdictStatus::Fail => "FAIL",
    };

    let mut out = String::new();
    out.push_str(&format!(
        "## modelbpa: {} ({status})\n\n",
        escape_md(&report.model.dataset)
    ));

    out.push_str(&format!(
        "Evaluated **{}** rule(s) over **{}** object(s)",
        report.rules_evaluated, report.model.objects_scanned
    ));
    if let Some(language) = &report.language {
        out.push_str(&format!(" (language: `{}`)", escape_md(language)));
    }
    out.push_str("\n\n");

    if !report.diagnostics.is_empty() {
        out.push_str("**Diagnostics:**\n");
        for d in &report.diagnostics {
            out.push_str(&format!("- `{}`: {}\n", d.kind.as_str(), escape_md(&d.message)));
        }
        out.push('\n');
    }

    let groups: Vec<_> = groups.iter().filter(|g| !g.rows.is_empty()).collect();
    if groups.is_empty() {
        out.push_str("No rule violations found.\n");
        return out;
    }

    for g in groups {
        out.push_str(&format!(
            "### {} ({})\n\n",
            escape_md(&g.category),
            tab_summary(&g.severity_counts)
        ));
        out.push_str("| Severity | Rule | Object Type | Object Name |\n");
        out.push_str("|---|---|---|---|\n");
        for row in &g.rows {
            out.push_str(&render_row(row));
        }
        out.push('\n');
    }
    out
}

fn render_row(row: &ReportRow) -> String {
    let rule = match &row.url {
        Some(url) => format!("[{}]({})", escape_md(&row.rule_name), url.replace(')', "%29")),
        None => escape_md(&row.rule_name),
    };
    format!(
        "| {} | {} | {} | {} |\n",
        row.severity.symbol(),
        rule,
        row.object_type.as_str(),
        code_span(&row.object_name)
    )
}

fn escape_md(s: &str) -> String {
    s.replace('|', "\\|").replace('`', "\\`")
}

/// Inline code for a table cell. Backslashes are literal inside code spans,
/// so the fence is one backtick longer than the longest run in `s`; pipes
/// still need escaping because the table splits cells first.
fn code_span(s: &str) -> String {
    let longest = s.split(|c: char| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    let body = s.replace('|', "\\|");
    if s.starts_with('`') || s.ends_with('`') {
        format!("{fence} {body} {fence}")
    } else {
        format!("{fence}{body}{fence}")
    }
}
