//! Built-in sample rule catalog.

use crate::{Condition, ConfigFile, Defaults, PropertyValue, RuleConfig, ScopeName, Severity};

fn eq(property: &str, value: impl Into<PropertyValue>) -> Condition {
    Condition::Eq {
        property: property.to_string(),
        value: value.into(),
    }
}

fn matches(property: &str, pattern: &str) -> Condition {
    Condition::Matches {
        property: property.to_string(),
        pattern: pattern.to_string(),
    }
}

fn is_empty(property: &str) -> Condition {
    Condition::IsEmpty {
        property: property.to_string(),
    }
}

impl ConfigFile {
    pub fn built_in() -> Self {
        Self {
            includes: vec![],
            defaults: Defaults::default(),
            rule: vec![
                // ============================================================
                // Performance
                // ============================================================
                RuleConfig {
                    name: "Do not use floating point data types".to_string(),
                    category: "Performance".to_string(),
                    severity: Severity::Warning,
                    scopes: vec![ScopeName::Column],
                    description: "Floating point data types can cause unexpected results when \
                        rounding or aggregating. Use Int64 or Decimal where possible."
                        .to_string(),
                    url: Some(
                        "https://www.sqlbi.com/articles/choosing-numeric-data-types-in-dax/"
                            .to_string(),
                    ),
                    condition: eq("data_type", "Double"),
                },
                RuleConfig {
                    name: "Avoid bi-directional relationships".to_string(),
                    category: "Performance".to_string(),
                    severity: Severity::Warning,
                    scopes: vec![ScopeName::Relationship],
                    description: "Bi-directional cross filtering widens the filter propagation \
                        path and can degrade query performance."
                        .to_string(),
                    url: Some(
                        "https://www.sqlbi.com/articles/bidirectional-relationships-and-ambiguity-in-dax/"
                            .to_string(),
                    ),
                    condition: eq("is_bidirectional", true),
                },
                RuleConfig {
                    name: "Model should have a date table".to_string(),
                    category: "Performance".to_string(),
                    severity: Severity::Warning,
                    scopes: vec![ScopeName::Model],
                    description: "Mark a calendar table as a date table so that time \
                        intelligence functions behave correctly."
                        .to_string(),
                    url: None,
                    condition: eq("has_date_table", false),
                },
                // ============================================================
                // DAX Expressions
                // ============================================================
                RuleConfig {
                    name: "Avoid the IFERROR function".to_string(),
                    category: "DAX Expressions".to_string(),
                    severity: Severity::Warning,
                    scopes: vec![ScopeName::Measure, ScopeName::CalculationItem],
                    description: "IFERROR forces the engine to evaluate row by row. Handle \
                        the error condition explicitly instead."
                        .to_string(),
                    url: Some(
                        "https://www.elegantbi.com/post/top10bestpractices".to_string(),
                    ),
                    condition: matches("expression", r"(?i)\bIFERROR\s*\("),
                },
                RuleConfig {
                    name: "Avoid LOOKUPVALUE in row level security filters".to_string(),
                    category: "DAX Expressions".to_string(),
                    severity: Severity::Error,
                    scopes: vec![ScopeName::RowLevelSecurity],
                    description: "LOOKUPVALUE in a security filter is evaluated for every row \
                        of the secured table. Use a relationship instead."
                        .to_string(),
                    url: None,
                    condition: matches("filter_expression", r"(?i)\bLOOKUPVALUE\s*\("),
                },
                // ============================================================
                // Formatting
                // ============================================================
                RuleConfig {
                    name: "Hide foreign keys".to_string(),
                    category: "Formatting".to_string(),
                    severity: Severity::Info,
                    scopes: vec![ScopeName::Column],
                    description: "Foreign keys should be hidden; report authors should use \
                        the attributes of the related dimension instead."
                        .to_string(),
                    url: None,
                    condition: Condition::All {
                        of: vec![eq("is_foreign_key", true), eq("is_hidden", false)],
                    },
                },
                RuleConfig {
                    name: "Provide format string for measures".to_string(),
                    category: "Formatting".to_string(),
                    severity: Severity::Warning,
                    scopes: vec![ScopeName::Measure],
                    description: "Visible measures should carry a format string.".to_string(),
                    url: None,
                    condition: Condition::All {
                        of: vec![eq("is_hidden", false), is_empty("format_string")],
                    },
                },
                // ============================================================
                // Maintenance
                // ============================================================
                RuleConfig {
                    name: "Visible objects should have a description".to_string(),
                    category: "Maintenance".to_string(),
                    severity: Severity::Info,
                    scopes: vec![ScopeName::Table, ScopeName::Column, ScopeName::Measure],
                    description: "Descriptions are shown as tooltips in report authoring \
                        tools and document the intent of the object."
                        .to_string(),
                    url: None,
                    condition: Condition::All {
                        of: vec![eq("is_hidden", false), is_empty("description")],
                    },
                },
                RuleConfig {
                    name: "Remove roles with no members".to_string(),
                    category: "Maintenance".to_string(),
                    severity: Severity::Info,
                    scopes: vec![ScopeName::Role],
                    description: "Roles without members have no effect and add clutter."
                        .to_string(),
                    url: None,
                    condition: eq("member_count", 0i64),
                },
                // ============================================================
                // Naming Conventions
                // ============================================================
                RuleConfig {
                    name: "Object names must not start or end with a space".to_string(),
                    category: "Naming Conventions".to_string(),
                    severity: Severity::Error,
                    scopes: vec![
                        ScopeName::Table,
                        ScopeName::Column,
                        ScopeName::Measure,
                        ScopeName::Hierarchy,
                        ScopeName::Partition,
                    ],
                    description: "Leading or trailing spaces make objects hard to reference \
                        in DAX and are easy to miss in client tools."
                        .to_string(),
                    url: None,
                    condition: matches("name", r"^\s|\s$"),
                },
            ],
        }
    }
}
