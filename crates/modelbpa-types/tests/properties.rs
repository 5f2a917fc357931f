//! Property-based tests for modelbpa-types.
//!
//! Covers scope-name parsing, severity glyph bijection and schema conformance
//! of serialized report rows.

use jsonschema::JSONSchema;
use modelbpa_types::{
    ConfigFile, ReportRow, RuleConfig, ScopeName, Severity, SeverityCounts,
};
use proptest::prelude::*;

fn compile_schema<T: schemars::JsonSchema>() -> JSONSchema {
    let schema = serde_json::to_value(schemars::schema_for!(T)).expect("schema serializes");
    JSONSchema::compile(&schema).expect("valid JSON schema")
}

// ============================================================================
// Proptest Strategies
// ============================================================================

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
    ]
}

fn arb_scope() -> impl Strategy<Value = ScopeName> {
    prop::sample::select(ScopeName::ALL.to_vec())
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.\\[\\]'-]{1,40}".prop_map(|s| s)
}

fn arb_report_row() -> impl Strategy<Value = ReportRow> {
    (
        arb_text(),
        arb_text(),
        arb_severity(),
        arb_scope(),
        arb_text(),
        arb_text(),
        prop::option::of("https://[a-z]{3,10}\\.com/[a-z]{0,10}"),
    )
        .prop_map(
            |(category, rule_name, severity, object_type, object_name, description, url)| {
                ReportRow {
                    category,
                    rule_name,
                    severity,
                    object_type,
                    object_name,
                    description,
                    url,
                }
            },
        )
}

proptest! {
    #[test]
    fn severity_glyph_mapping_is_bijective(sev in arb_severity()) {
        let glyph = sev.symbol();
        prop_assert_eq!(Severity::from_symbol(glyph), Some(sev));
        for other in Severity::ALL {
            if other != sev {
                prop_assert_ne!(other.symbol(), glyph);
            }
        }
    }

    #[test]
    fn scope_display_name_parses_back(scope in arb_scope()) {
        prop_assert_eq!(scope.as_str().parse::<ScopeName>(), Ok(scope));
        let json = serde_json::to_string(&scope).expect("serialize");
        prop_assert_eq!(json, format!("\"{}\"", scope.as_str()));
    }

    #[test]
    fn report_rows_conform_to_schema(row in arb_report_row()) {
        let schema = compile_schema::<ReportRow>();
        let value = serde_json::to_value(&row).expect("serialize");
        prop_assert!(schema.is_valid(&value));
        let back: ReportRow = serde_json::from_value(value).expect("deserialize");
        prop_assert_eq!(back, row);
    }

    #[test]
    fn counts_total_is_sum(sevs in prop::collection::vec(arb_severity(), 0..50)) {
        let mut counts = SeverityCounts::default();
        for s in &sevs {
            counts.bump(*s);
        }
        prop_assert_eq!(counts.total() as usize, sevs.len());
    }
}

#[test]
fn built_in_config_conforms_to_schema() {
    let schema = compile_schema::<ConfigFile>();
    let value = serde_json::to_value(ConfigFile::built_in()).expect("serialize");
    assert!(schema.is_valid(&value));
}

#[test]
fn rule_config_parses_from_toml_with_aliases() {
    let text = r#"
name = "No hidden measures"
category = "Maintenance"
severity = "Warning"
scopes = ["Measure", "calculation_item", "Row Level Security"]
description = "d"
condition = { op = "all", of = [
    { op = "eq", property = "is_hidden", value = true },
    { op = "gt", property = "ordinal", value = 3 },
] }
"#;
    let rule: RuleConfig = toml::from_str(text).expect("parse rule");
    assert_eq!(rule.severity, Severity::Warning);
    assert_eq!(
        rule.scopes,
        vec![
            ScopeName::Measure,
            ScopeName::CalculationItem,
            ScopeName::RowLevelSecurity
        ]
    );
    assert!(rule.url.is_none());
}

#[test]
fn built_in_config_survives_toml() {
    let cfg = ConfigFile::built_in();
    let text = toml::to_string_pretty(&cfg).expect("render toml");
    let back: ConfigFile = toml::from_str(&text).expect("parse toml");
    assert_eq!(back.rule.len(), cfg.rule.len());
    assert_eq!(back.rule[0].name, cfg.rule[0].name);
}
