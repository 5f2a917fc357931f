//! Joins violations back onto rule metadata and groups the rows by category.

use std::collections::BTreeMap;

use tracing::warn;

use modelbpa_types::{
    CategoryGroup, Diagnostic, DiagnosticKind, ReportRow, RuleMeta, SeverityCounts, Violation,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    /// Sorted by (category, rule name, object type, object name).
    pub rows: Vec<ReportRow>,
    /// Rows grouped by category, in row order.
    pub groups: Vec<CategoryGroup>,
    pub counts: SeverityCounts,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build report rows from `violations` and the catalog that produced them.
///
/// Violations are joined to rules by name. The first rule with a given name
/// wins; later duplicates are reported once per name. A violation whose rule
/// is missing from the catalog is dropped with a diagnostic.
pub fn assemble(violations: &[Violation], rules: &[RuleMeta]) -> Assembly {
    let mut diagnostics = Vec::new();

    let mut index: BTreeMap<&str, &RuleMeta> = BTreeMap::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for rule in rules {
        if index.contains_key(rule.name.as_str()) {
            if !duplicates.contains(&rule.name.as_str()) {
                duplicates.push(&rule.name);
            }
        } else {
            index.insert(&rule.name, rule);
        }
    }
    for name in duplicates {
        warn!("Rule name '{}' is defined more than once; using the first definition", name);
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::DuplicateRule,
                "rule name is defined more than once; the first definition was used",
            )
            .with_rule(name),
        );
    }

    let mut rows = Vec::with_capacity(violations.len());
    for v in violations {
        let Some(rule) = index.get(v.rule_name.as_str()) else {
            warn!(
                "Dropping violation on '{}': rule '{}' is not in the catalog",
                v.object_name, v.rule_name
            );
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::JoinConsistency,
                    format!("violation on '{}' references an unknown rule", v.object_name),
                )
                .with_rule(v.rule_name.clone())
                .with_scope(v.scope),
            );
            continue;
        };
        rows.push(ReportRow {
            category: rule.category.clone(),
            rule_name: rule.name.clone(),
            severity: rule.severity,
            object_type: v.scope,
            object_name: v.object_name.clone(),
            description: rule.description.clone(),
            url: rule.url.clone(),
        });
    }

    rows.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut counts = SeverityCounts::default();
    for row in &rows {
        counts.bump(row.severity);
    }

    Assembly {
        groups: group_by_category(&rows),
        rows,
        counts,
        diagnostics,
    }
}

/// Swap each row's category, rule name and description for the translated
/// text of the rule that produced it. `translated[i]` must be the localized
/// copy of `original[i]`; severity, URL and the join itself are unchanged.
///
/// Distinct rules that end up sharing a translated name are reported, but
/// each row still carries its own rule's metadata.
pub fn localize(assembly: Assembly, original: &[RuleMeta], translated: &[RuleMeta]) -> Assembly {
    let mut by_original: BTreeMap<&str, &RuleMeta> = BTreeMap::new();
    let mut owner: BTreeMap<&str, &str> = BTreeMap::new();
    let mut diagnostics = assembly.diagnostics;

    for (orig, local) in original.iter().zip(translated) {
        if by_original.contains_key(orig.name.as_str()) {
            continue;
        }
        by_original.insert(&orig.name, local);

        match owner.get(local.name.as_str()) {
            Some(first) if *first != orig.name => {
                warn!(
                    "Rules '{}' and '{}' both translate to '{}'",
                    first, orig.name, local.name
                );
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::TranslationCollision,
                        format!(
                            "translated name '{}' is shared with rule '{}'",
                            local.name, first
                        ),
                    )
                    .with_rule(orig.name.clone()),
                );
            }
            Some(_) => {}
            None => {
                owner.insert(&local.name, &orig.name);
            }
        }
    }

    let mut rows: Vec<ReportRow> = assembly
        .rows
        .into_iter()
        .map(|mut row| {
            if let Some(local) = by_original.get(row.rule_name.as_str()) {
                row.category = local.category.clone();
                row.rule_name = local.name.clone();
                row.description = local.description.clone();
            }
            row
        })
        .collect();
    rows.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    Assembly {
        groups: group_by_category(&rows),
        rows,
        counts: assembly.counts,
        diagnostics,
    }
}

fn sort_key(row: &ReportRow) -> (&str, &str, &str, &str) {
    (
        &row.category,
        &row.rule_name,
        row.object_type.as_str(),
        &row.object_name,
    )
}

/// Group consecutive rows by category. Expects rows sorted by category.
pub fn group_by_category(rows: &[ReportRow]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some(g) if g.category == row.category => {
                g.severity_counts.bump(row.severity);
                g.rows.push(row.clone());
            }
            _ => {
                let mut severity_counts = SeverityCounts::default();
                severity_counts.bump(row.severity);
                groups.push(CategoryGroup {
                    category: row.category.clone(),
                    rows: vec![row.clone()],
                    severity_counts,
                });
            }
        }
    }
    groups
}
