//! Self-contained HTML rendering of a [`ReportDocument`].
//!
//! The output is a single fragment with embedded CSS and a small script
//! that switches tabs and keeps tooltips inside the viewport.

use html_escape::{encode_double_quoted_attribute, encode_text};

use modelbpa_types::ReportRow;

use crate::document::{ReportDocument, Tab};

const STYLE: &str = r#"<style>
.bpa-tab { overflow: hidden; border: 1px solid #ccc; background-color: #f1f1f1; }
.bpa-tab button { background-color: inherit; float: left; border: none; outline: none; cursor: pointer; padding: 10px 14px; transition: 0.3s; }
.bpa-tab button:hover { background-color: #ddd; }
.bpa-tab button.active { background-color: #ccc; }
.bpa-tabcontent { display: none; padding: 6px 12px; border: 1px solid #ccc; border-top: none; }
.bpa-tabcontent.active { display: block; }
.bpa-tooltip { position: relative; display: inline-block; }
.bpa-tooltip .bpa-tooltiptext { visibility: hidden; width: 300px; background-color: #555; color: #fff; text-align: left; border-radius: 6px; padding: 5px; position: absolute; z-index: 1; bottom: 125%; left: 50%; margin-left: -150px; opacity: 0; transition: opacity 0.3s; }
.bpa-tooltip:hover .bpa-tooltiptext { visibility: visible; opacity: 1; }
</style>
"#;

const SCRIPT: &str = r#"<script>
function openTab(evt, tabId) {
  var contents = document.getElementsByClassName("bpa-tabcontent");
  for (var i = 0; i < contents.length; i++) { contents[i].classList.remove("active"); }
  var links = document.getElementsByClassName("bpa-tablink");
  for (var i = 0; i < links.length; i++) { links[i].classList.remove("active"); }
  document.getElementById(tabId).classList.add("active");
  evt.currentTarget.classList.add("active");
}
function adjustTooltipPosition(evt) {
  var tip = evt.currentTarget.querySelector(".bpa-tooltiptext");
  if (!tip) { return; }
  tip.style.left = "50%";
  var rect = tip.getBoundingClientRect();
  if (rect.right > window.innerWidth) { tip.style.left = (50 - (rect.right - window.innerWidth) / rect.width * 100) + "%"; }
  if (rect.left < 0) { tip.style.left = (50 - rect.left / rect.width * 100) + "%"; }
}
</script>
"#;

/// Render the document. An empty document renders a "no violations" notice.
pub fn render_html(doc: &ReportDocument) -> String {
    let mut out = String::new();
    out.push_str(STYLE);

    if doc.is_empty() {
        out.push_str("<p>No rule violations found.</p>\n");
        return out;
    }

    out.push_str("<div class=\"bpa-tab\">\n");
    for tab in &doc.tabs {
        out.push_str(&format!(
            "  <button class=\"bpa-tablink{active}\" onclick=\"openTab(event, '{id}')\">{label}</button>\n",
            active = if tab.active { " active" } else { "" },
            id = encode_double_quoted_attribute(&tab.id),
            label = encode_text(&tab.label),
        ));
    }
    out.push_str("</div>\n");

    for tab in &doc.tabs {
        out.push_str(&render_tab(tab));
    }

    out.push_str(SCRIPT);
    out
}

fn render_tab(tab: &Tab) -> String {
    let mut out = format!(
        "<div id=\"{id}\" class=\"bpa-tabcontent{active}\">\n",
        id = encode_double_quoted_attribute(&tab.id),
        active = if tab.active { " active" } else { "" },
    );
    out.push_str("<table>\n");
    out.push_str(
        "  <tr><th>Rule Name</th><th>Object Type</th><th>Object Name</th><th>Severity</th></tr>\n",
    );
    for row in &tab.rows {
        out.push_str(&render_row(row));
    }
    out.push_str("</table>\n</div>\n");
    out
}

fn render_row(row: &ReportRow) -> String {
    let name = match &row.url {
        Some(url) => format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(url),
            encode_text(&row.rule_name)
        ),
        None => encode_text(&row.rule_name).into_owned(),
    };
    let rule_cell = if row.description.trim().is_empty() {
        name
    } else {
        format!(
            "<span class=\"bpa-tooltip\" onmouseover=\"adjustTooltipPosition(event)\">{name}<span class=\"bpa-tooltiptext\">{}</span></span>",
            encode_text(&row.description)
        )
    };
    format!(
        "  <tr><td>{rule_cell}</td><td>{}</td><td>{}</td><td style=\"text-align: center;\">{}</td></tr>\n",
        encode_text(row.object_type.as_str()),
        encode_text(&row.object_name),
        row.severity.symbol(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_document;
    use modelbpa_types::{CategoryGroup, ScopeName, Severity, SeverityCounts};

    fn row(rule: &str, description: &str, url: Option<&str>) -> ReportRow {
        ReportRow {
            category: "Performance".to_string(),
            rule_name: rule.to_string(),
            severity: Severity::Warning,
            object_type: ScopeName::Column,
            object_name: "'Sales Data'[Amount]".to_string(),
            description: description.to_string(),
            url: url.map(str::to_string),
        }
    }

    fn doc(rows: Vec<ReportRow>) -> ReportDocument {
        let mut severity_counts = SeverityCounts::default();
        for r in &rows {
            severity_counts.bump(r.severity);
        }
        build_document(&[CategoryGroup {
            category: "Performance".to_string(),
            rows,
            severity_counts,
        }])
    }

    #[test]
    fn renders_link_tooltip_and_glyph() {
        let html = render_html(&doc(vec![row(
            "Avoid floats",
            "Use Int64 or Decimal.",
            Some("https://example.com/floats"),
        )]));
        assert!(html.contains("<a href=\"https://example.com/floats\">Avoid floats</a>"));
        assert!(html.contains("<span class=\"bpa-tooltiptext\">Use Int64 or Decimal.</span>"));
        assert!(html.contains(Severity::Warning.symbol()));
        assert!(html.contains("<td>Column</td>"));
        assert!(html.contains("function openTab"));
        assert!(html.contains("function adjustTooltipPosition"));
    }

    #[test]
    fn plain_name_without_url_and_no_tooltip_without_description() {
        let html = render_html(&doc(vec![row("No link", "", None)]));
        assert!(html.contains("<td>No link</td>"));
        assert!(!html.contains("<a href"));
        assert!(!html.contains("class=\"bpa-tooltiptext\""));
    }

    #[test]
    fn text_is_escaped() {
        let html = render_html(&doc(vec![row(
            "<script>alert(1)</script>",
            "a < b & c",
            Some("https://example.com/?a=1&b=\"2\""),
        )]));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("a &lt; b &amp; c"));
        assert!(html.contains("&amp;b=&quot;2&quot;"));
        assert!(html.contains("<td>'Sales Data'[Amount]</td>"));
    }

    #[test]
    fn exactly_one_active_tab() {
        let mut a = row("a", "", None);
        a.category = "A".to_string();
        let mut b = row("b", "", None);
        b.category = "B".to_string();
        let groups = crate::assemble::group_by_category(&[a, b]);
        let html = render_html(&build_document(&groups));
        assert_eq!(html.matches("bpa-tablink active").count(), 1);
        assert_eq!(html.matches("bpa-tabcontent active").count(), 1);
    }

    #[test]
    fn empty_document_renders_notice() {
        let html = render_html(&ReportDocument::default());
        assert!(html.contains("No rule violations found."));
        assert!(!html.contains("bpa-tablink"));
    }
}
