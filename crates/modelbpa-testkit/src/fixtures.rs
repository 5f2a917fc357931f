//! Common test fixtures for modelbpa.
//!
//! [`sample_model`] is small enough to reason about by hand and triggers
//! every built-in rule except the date-table and naming rules.

use modelbpa_model::{SemanticModel, load_model};
use modelbpa_types::{ScopeName, Severity};

/// The sample model as `.bim`-style JSON.
pub fn sample_model_json() -> &'static str {
    r#"{
  "name": "Sample",
  "compatibilityLevel": 1567,
  "model": {
    "culture": "en-US",
    "tables": [
      {
        "name": "Table1",
        "columns": [
          { "name": "A", "dataType": "double" },
          { "name": "B", "dataType": "int64", "description": "Date key" },
          { "name": "Name", "dataType": "string", "description": "Customer name" }
        ],
        "measures": [
          { "name": "Total A", "expression": "SUM(Table1[A])" },
          {
            "name": "Safe Ratio",
            "expression": ["IFERROR(", "  DIVIDE([Total A], 2),", "  0", ")"],
            "formatString": "0.00",
            "description": "Half of Total A"
          }
        ],
        "hierarchies": [
          { "name": "By Name", "levels": [ { "name": "Name", "column": "Name" } ] }
        ],
        "partitions": [
          { "name": "Table1", "mode": "import", "source": { "type": "m", "expression": "let Source = 1 in Source" } }
        ]
      },
      {
        "name": "Date",
        "dataCategory": "Time",
        "description": "Calendar",
        "columns": [
          { "name": "DateKey", "dataType": "int64", "isKey": true, "isHidden": true }
        ]
      },
      {
        "name": "Time Intelligence",
        "description": "Time calculations",
        "columns": [ { "name": "Name", "dataType": "string", "description": "Item" } ],
        "calculationGroup": {
          "calculationItems": [
            { "name": "YTD", "expression": "IFERROR(TOTALYTD(SELECTEDMEASURE(), 'Date'[DateKey]), BLANK())", "ordinal": 0 }
          ]
        }
      }
    ],
    "relationships": [
      {
        "name": "r1",
        "fromTable": "Table1",
        "fromColumn": "B",
        "toTable": "Date",
        "toColumn": "DateKey",
        "crossFilteringBehavior": "bothDirections"
      }
    ],
    "roles": [
      {
        "name": "Readers",
        "tablePermissions": [
          { "name": "Table1", "filterExpression": "[Name] = LOOKUPVALUE(Table1[Name], Table1[B], 1)" }
        ]
      }
    ]
  }
}"#
}

pub fn sample_model() -> SemanticModel {
    load_model(sample_model_json()).expect("sample model should load")
}

/// (rule name, scope, object name, severity) for every violation the
/// built-in catalog produces on [`sample_model`], in evaluation order.
pub fn expected_built_in_violations() -> Vec<(&'static str, ScopeName, &'static str, Severity)> {
    vec![
        ("Do not use floating point data types", ScopeName::Column, "Table1[A]", Severity::Warning),
        (
            "Avoid bi-directional relationships",
            ScopeName::Relationship,
            "Table1[B] -> Date[DateKey]",
            Severity::Warning,
        ),
        ("Avoid the IFERROR function", ScopeName::Measure, "Safe Ratio", Severity::Warning),
        (
            "Avoid the IFERROR function",
            ScopeName::CalculationItem,
            "'Time Intelligence'[YTD]",
            Severity::Warning,
        ),
        (
            "Avoid LOOKUPVALUE in row level security filters",
            ScopeName::RowLevelSecurity,
            "Readers[Table1]",
            Severity::Error,
        ),
        ("Hide foreign keys", ScopeName::Column, "Table1[B]", Severity::Info),
        ("Provide format string for measures", ScopeName::Measure, "Total A", Severity::Warning),
        ("Visible objects should have a description", ScopeName::Table, "Table1", Severity::Info),
        ("Visible objects should have a description", ScopeName::Column, "Table1[A]", Severity::Info),
        ("Visible objects should have a description", ScopeName::Measure, "Total A", Severity::Info),
        ("Remove roles with no members", ScopeName::Role, "Readers", Severity::Info),
    ]
}

/// Collection of sample configuration files for testing.
pub mod sample_configs {
    use modelbpa_types::{
        Condition, ConfigFile, Defaults, FailOn, PropertyValue, RuleConfig, ScopeName, Severity,
    };

    pub fn empty() -> ConfigFile {
        ConfigFile::empty()
    }

    /// The built-in configuration from modelbpa-types.
    pub fn built_in() -> ConfigFile {
        ConfigFile::built_in()
    }

    /// One column rule that flags floating point columns.
    pub fn minimal() -> ConfigFile {
        ConfigFile {
            includes: vec![],
            defaults: Defaults::default(),
            rule: vec![RuleConfig {
                name: "AvoidFloatColumn".to_string(),
                category: "Performance".to_string(),
                severity: Severity::Warning,
                scopes: vec![ScopeName::Column],
                description: "Use Int64 or Decimal.".to_string(),
                url: None,
                condition: Condition::Eq {
                    property: "data_type".to_string(),
                    value: PropertyValue::Text("Double".to_string()),
                },
            }],
        }
    }

    /// Minimal config with non-default defaults.
    pub fn with_defaults() -> ConfigFile {
        ConfigFile {
            defaults: Defaults {
                language: Some("it-IT".to_string()),
                skip_bundled_translations: Some(false),
                concurrency: Some(4),
                translation_concurrency: Some(2),
                fail_on: Some(FailOn::Warning),
                workspace: Some("Finance".to_string()),
            },
            ..minimal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_model_loads() {
        let model = sample_model();
        assert_eq!(model.name, "Sample");
        assert_eq!(model.tables.len(), 3);
        assert_eq!(model.object_count(), 17);
    }

    #[test]
    fn expected_counts() {
        let expected = expected_built_in_violations();
        let count = |s| expected.iter().filter(|v| v.3 == s).count();
        assert_eq!(count(Severity::Error), 1);
        assert_eq!(count(Severity::Warning), 5);
        assert_eq!(count(Severity::Info), 5);
    }
}
