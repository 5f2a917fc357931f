//! CSV and TSV renderings of the flat report table.
//!
//! CSV follows RFC 4180 for proper escaping.

use modelbpa_types::ReportRow;

const CSV_HEADER: &str = "Category,Rule Name,Severity,Object Type,Object Name,Description,URL";

/// Columns: Category, Rule Name, Severity, Object Type, Object Name, Description, URL
pub fn render_csv(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&render_line(row, ",", escape_csv_field));
    }
    out
}

/// Same columns as [`render_csv`], tab separated.
pub fn render_tsv(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADER.replace(',', "\t"));
    out.push('\n');
    for row in rows {
        out.push_str(&render_line(row, "\t", escape_tsv_field));
    }
    out
}

fn render_line(row: &ReportRow, sep: &str, escape: fn(&str) -> String) -> String {
    let fields = [
        escape(&row.category),
        escape(&row.rule_name),
        row.severity.label().to_string(),
        escape(row.object_type.as_str()),
        escape(&row.object_name),
        escape(&row.description),
        escape(row.url.as_deref().unwrap_or("")),
    ];
    let mut line = fields.join(sep);
    line.push('\n');
    line
}

/// Fields containing commas, double quotes, or newlines are quoted.
/// Double quotes within the field are escaped by doubling them.
fn escape_csv_field(s: &str) -> String {
    let needs_quoting = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');

    if needs_quoting {
        let escaped = s.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        s.to_string()
    }
}

/// Tabs and newlines are escaped with backslash notation.
fn escape_tsv_field(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
