//! Property-based tests for modelbpa-model.

use proptest::prelude::*;

use modelbpa_model::{ModelError, load_model};

proptest! {
    #[test]
    fn loader_never_panics(text in "\\PC{0,200}") {
        let _ = load_model(&text);
    }

    #[test]
    fn multi_line_expressions_are_joined(lines in prop::collection::vec("[A-Za-z0-9()\\[\\] ]{0,20}", 1..6)) {
        let json = serde_json::json!({
            "tables": [ { "name": "T", "measures": [ { "name": "M", "expression": lines } ] } ]
        });
        let model = load_model(&json.to_string()).unwrap();
        prop_assert_eq!(&model.tables[0].measures[0].expression, &lines.join("\n"));
    }

    #[test]
    fn table_order_is_preserved(names in prop::collection::btree_set("[A-Za-z][A-Za-z0-9]{0,8}", 1..6)) {
        let names: Vec<String> = names.into_iter().rev().collect();
        let tables: Vec<_> = names.iter().map(|n| serde_json::json!({ "name": n })).collect();
        let model = load_model(&serde_json::json!({ "tables": tables }).to_string()).unwrap();
        let got: Vec<&str> = model.tables.iter().map(|t| t.name.as_str()).collect();
        prop_assert_eq!(got, names.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_table_names_are_rejected(name in "[A-Za-z]{1,8}") {
        let json = serde_json::json!({ "tables": [ { "name": name }, { "name": name } ] });
        let is_duplicate = matches!(load_model(&json.to_string()), Err(ModelError::DuplicateTable(_)));
        prop_assert!(is_duplicate);
    }
}
