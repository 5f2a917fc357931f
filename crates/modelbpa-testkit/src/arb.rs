//! Proptest strategies for generating valid test inputs.
//!
//! Strategies are constructive: generated names, patterns and models are
//! valid by construction rather than by filtering.
//!
//! # Bounds
//!
//! - Max tables per model: 4
//! - Max columns / measures per table: 5
//! - Max rules per config: 5

use modelbpa_model::{
    Column, CrossFilteringBehavior, DataType, Measure, Relationship, Role, RoleMember,
    SemanticModel, Table,
};
use modelbpa_types::{
    Condition, ConfigFile, Defaults, FailOn, PropertyValue, ReportRow, RuleConfig, RuleMeta,
    ScopeName, Severity, SeverityCounts, VerdictStatus, Violation,
};
use proptest::prelude::*;

// =============================================================================
// Constants for bounding generated data
// =============================================================================

pub const MAX_TABLES: usize = 4;
pub const MAX_OBJECTS_PER_TABLE: usize = 5;
pub const MAX_RULES: usize = 5;

// =============================================================================
// Enum Strategies
// =============================================================================

pub fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
    ]
}

pub fn arb_scope() -> impl Strategy<Value = ScopeName> {
    prop::sample::select(ScopeName::ALL.to_vec())
}

pub fn arb_fail_on() -> impl Strategy<Value = FailOn> {
    prop_oneof![
        Just(FailOn::Error),
        Just(FailOn::Warning),
        Just(FailOn::Never),
    ]
}

pub fn arb_verdict_status() -> impl Strategy<Value = VerdictStatus> {
    prop_oneof![
        Just(VerdictStatus::Pass),
        Just(VerdictStatus::Warn),
        Just(VerdictStatus::Fail),
    ]
}

pub fn arb_data_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(vec![
        DataType::String,
        DataType::Int64,
        DataType::Double,
        DataType::DateTime,
        DataType::Decimal,
        DataType::Boolean,
    ])
}

// =============================================================================
// String Strategies
// =============================================================================

/// Object names: identifiers, names with spaces, and names with quotes.
pub fn arb_object_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::string::string_regex("[A-Za-z][A-Za-z0-9_]{0,15}").expect("valid regex"),
        1 => prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,14}[A-Za-z0-9]").expect("valid regex"),
        1 => prop::string::string_regex("[A-Za-z]{1,6}'[A-Za-z]{1,6}").expect("valid regex"),
    ]
}

pub fn arb_category() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Performance",
        "DAX Expressions",
        "Error Prevention",
        "Formatting",
        "Maintenance",
        "Naming Conventions",
    ])
    .prop_map(|s| s.to_string())
}

/// Free text for descriptions, including characters that need escaping in
/// HTML, Markdown and CSV.
pub fn arb_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 <>&\"',|*_\\[\\]]{0,60}").expect("valid regex")
}

pub fn arb_url() -> impl Strategy<Value = Option<String>> {
    prop::option::of(
        prop::string::string_regex("[a-z]{3,10}")
            .expect("valid regex")
            .prop_map(|p| format!("https://example.com/{p}")),
    )
}

// =============================================================================
// Rule Strategies
// =============================================================================

pub fn arb_rule_meta() -> impl Strategy<Value = RuleMeta> {
    (arb_object_name(), arb_category(), arb_severity(), arb_text(), arb_url()).prop_map(
        |(name, category, severity, description, url)| RuleMeta {
            name,
            category,
            severity,
            description,
            url,
        },
    )
}

/// Conditions valid for every scope (they only use `name`).
pub fn arb_name_condition() -> impl Strategy<Value = Condition> {
    let leaf = prop_oneof![
        Just(Condition::Always),
        "[A-Za-z]{1,3}".prop_map(|v| Condition::Contains {
            property: "name".to_string(),
            value: v,
            case_sensitive: false,
        }),
        "[A-Za-z]{1,3}".prop_map(|v| Condition::Matches {
            property: "name".to_string(),
            pattern: format!("^{v}"),
        }),
        arb_object_name().prop_map(|v| Condition::Eq {
            property: "name".to_string(),
            value: PropertyValue::Text(v),
        }),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(|of| Condition::All { of }),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|of| Condition::Any { of }),
            inner.prop_map(|c| Condition::Not {
                condition: Box::new(c)
            }),
        ]
    })
}

pub fn arb_rule_config() -> impl Strategy<Value = RuleConfig> {
    (
        arb_rule_meta(),
        prop::collection::vec(arb_scope(), 1..4),
        arb_name_condition(),
    )
        .prop_map(|(meta, scopes, condition)| RuleConfig {
            name: meta.name,
            category: meta.category,
            severity: meta.severity,
            scopes,
            description: meta.description,
            url: meta.url,
            condition,
        })
}

pub fn arb_defaults() -> impl Strategy<Value = Defaults> {
    (
        prop::option::of(prop::sample::select(vec!["it-IT", "de-DE", "xx-XX"])),
        prop::option::of(any::<bool>()),
        prop::option::of(1usize..8),
        prop::option::of(1usize..8),
        prop::option::of(arb_fail_on()),
    )
        .prop_map(
            |(language, skip_bundled_translations, concurrency, translation_concurrency, fail_on)| {
                Defaults {
                    language: language.map(str::to_string),
                    skip_bundled_translations,
                    concurrency,
                    translation_concurrency,
                    fail_on,
                    workspace: None,
                }
            },
        )
}

/// Configs whose rule names are unique.
pub fn arb_config_file() -> impl Strategy<Value = ConfigFile> {
    (arb_defaults(), prop::collection::vec(arb_rule_config(), 0..MAX_RULES)).prop_map(
        |(defaults, rules)| {
            let rule = rules
                .into_iter()
                .enumerate()
                .map(|(i, mut r)| {
                    r.name = format!("{} {i}", r.name);
                    r
                })
                .collect();
            ConfigFile {
                includes: vec![],
                defaults,
                rule,
            }
        },
    )
}

// =============================================================================
// Report Strategies
// =============================================================================

pub fn arb_violation() -> impl Strategy<Value = Violation> {
    (arb_object_name(), arb_scope(), arb_object_name()).prop_map(
        |(object_name, scope, rule_name)| Violation {
            object_name,
            scope,
            rule_name,
        },
    )
}

pub fn arb_report_row() -> impl Strategy<Value = ReportRow> {
    (arb_rule_meta(), arb_scope(), arb_object_name()).prop_map(|(meta, object_type, object_name)| {
        ReportRow {
            category: meta.category,
            rule_name: meta.name,
            severity: meta.severity,
            object_type,
            object_name,
            description: meta.description,
            url: meta.url,
        }
    })
}

pub fn arb_severity_counts() -> impl Strategy<Value = SeverityCounts> {
    (0u32..100, 0u32..100, 0u32..100).prop_map(|(info, warning, error)| SeverityCounts {
        info,
        warning,
        error,
    })
}

/// A catalog of rule metadata plus violations that reference it (and, with
/// `orphans`, some that reference no rule).
pub fn arb_catalog_and_violations(
    orphans: bool,
) -> impl Strategy<Value = (Vec<RuleMeta>, Vec<Violation>)> {
    prop::collection::vec(arb_rule_meta(), 1..MAX_RULES)
        .prop_map(|metas| {
            metas
                .into_iter()
                .enumerate()
                .map(|(i, mut m)| {
                    m.name = format!("{} {i}", m.name);
                    m
                })
                .collect::<Vec<_>>()
        })
        .prop_flat_map(move |metas| {
            let names: Vec<String> = metas.iter().map(|m| m.name.clone()).collect();
            let known = (prop::sample::select(names), arb_scope(), arb_object_name()).prop_map(
                |(rule_name, scope, object_name)| Violation {
                    object_name,
                    scope,
                    rule_name,
                },
            );
            let orphan_count = if orphans { 0..3 } else { 0..1 };
            (
                Just(metas),
                prop::collection::vec(known, 0..20),
                prop::collection::vec(
                    arb_violation().prop_map(|mut v| {
                        v.rule_name = format!("missing {}", v.rule_name);
                        v
                    }),
                    orphan_count,
                ),
            )
        })
        .prop_map(|(metas, mut violations, orphans)| {
            violations.extend(orphans);
            (metas, violations)
        })
}

// =============================================================================
// Model Strategies
// =============================================================================

fn arb_column() -> impl Strategy<Value = Column> {
    (arb_object_name(), arb_data_type(), any::<bool>(), arb_text()).prop_map(
        |(name, data_type, is_hidden, description)| Column {
            name,
            data_type,
            is_hidden,
            description,
            is_available_in_mdx: true,
            ..Column::default()
        },
    )
}

fn arb_measure() -> impl Strategy<Value = Measure> {
    (
        arb_object_name(),
        prop::sample::select(vec!["SUM(T[A])", "IFERROR(1/0, 0)", "COUNTROWS(T)"]),
        prop::option::of(Just("0.00".to_string())),
    )
        .prop_map(|(name, expression, format_string)| Measure {
            name,
            expression: expression.to_string(),
            format_string,
            ..Measure::default()
        })
}

fn dedup_by_name<T>(items: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = std::collections::BTreeSet::new();
    items
        .into_iter()
        .filter(|i| seen.insert(name(i).to_string()))
        .collect()
}

fn arb_table() -> impl Strategy<Value = Table> {
    (
        arb_object_name(),
        any::<bool>(),
        prop::collection::vec(arb_column(), 0..MAX_OBJECTS_PER_TABLE),
        prop::collection::vec(arb_measure(), 0..MAX_OBJECTS_PER_TABLE),
    )
        .prop_map(|(name, is_hidden, columns, measures)| Table {
            name,
            is_hidden,
            columns: dedup_by_name(columns, |c| c.name.as_str()),
            measures: dedup_by_name(measures, |m| m.name.as_str()),
            ..Table::default()
        })
}

/// Small, internally consistent models: unique table names, relationships
/// that point at existing columns.
pub fn arb_semantic_model() -> impl Strategy<Value = SemanticModel> {
    (
        prop::collection::vec(arb_table(), 1..MAX_TABLES),
        any::<bool>(),
        prop::collection::vec((arb_object_name(), 0usize..3), 0..3),
    )
        .prop_map(|(tables, bidirectional, roles)| {
            let tables = dedup_by_name(tables, |t| t.name.as_str());
            let endpoints: Vec<(String, String)> = tables
                .iter()
                .flat_map(|t| t.columns.iter().map(move |c| (t.name.clone(), c.name.clone())))
                .collect();
            let relationships = match endpoints.as_slice() {
                [from, .., to] => vec![Relationship {
                    name: "r1".to_string(),
                    from_table: from.0.clone(),
                    from_column: from.1.clone(),
                    to_table: to.0.clone(),
                    to_column: to.1.clone(),
                    cross_filtering_behavior: if bidirectional {
                        CrossFilteringBehavior::BothDirections
                    } else {
                        CrossFilteringBehavior::OneDirection
                    },
                    is_active: true,
                    from_cardinality: modelbpa_model::Cardinality::Many,
                    to_cardinality: modelbpa_model::Cardinality::One,
                }],
                _ => vec![],
            };
            let roles = dedup_by_name(
                roles
                    .into_iter()
                    .map(|(name, members)| Role {
                        name,
                        model_permission: "read".to_string(),
                        members: (0..members)
                            .map(|i| RoleMember {
                                member_name: format!("user{i}@example.com"),
                            })
                            .collect(),
                        table_permissions: vec![],
                    })
                    .collect(),
                |r| r.name.as_str(),
            );
            SemanticModel {
                name: "Generated".to_string(),
                tables,
                relationships,
                roles,
                ..SemanticModel::default()
            }
        })
}
