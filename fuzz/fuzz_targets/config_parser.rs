//! Fuzz target for TOML config parsing and rule compilation.
//!
//! Arbitrary text must never panic the parser, and anything that parses must
//! either compile or fail with a `RuleCompileError`.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use modelbpa_domain::compile_rules;
use modelbpa_types::ConfigFile;

#[derive(Arbitrary, Debug)]
struct FuzzConfig {
    use_structured: bool,
    raw: String,
    rules: Vec<FuzzRule>,
}

#[derive(Arbitrary, Debug)]
struct FuzzRule {
    name: String,
    category: String,
    severity: u8,
    scope: u8,
    property: String,
    op: u8,
    value: String,
}

const SCOPES: [&str; 5] = ["Table", "Column", "Measure", "Relationship", "Model"];

impl FuzzConfig {
    fn to_toml_string(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            out.push_str("\n[[rule]]\n");
            out.push_str(&format!("name = {}\n", escape_toml_string(&rule.name)));
            out.push_str(&format!(
                "category = {}\n",
                escape_toml_string(&rule.category)
            ));
            let sev = match rule.severity % 3 {
                0 => "info",
                1 => "warning",
                _ => "error",
            };
            out.push_str(&format!("severity = \"{sev}\"\n"));
            let scope = SCOPES[rule.scope as usize % SCOPES.len()];
            out.push_str(&format!("scopes = [\"{scope}\"]\n"));

            let property = escape_toml_string(&rule.property);
            let value = escape_toml_string(&rule.value);
            let condition = match rule.op % 4 {
                0 => format!("{{ op = \"eq\", property = {property}, value = {value} }}"),
                1 => format!("{{ op = \"matches\", property = {property}, pattern = {value} }}"),
                2 => format!("{{ op = \"is_empty\", property = {property} }}"),
                _ => "{ op = \"always\" }".to_string(),
            };
            out.push_str(&format!("condition = {condition}\n"));
        }
        out
    }
}

fn escape_toml_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fuzz_target!(|input: FuzzConfig| {
    let text = if input.use_structured {
        input.to_toml_string()
    } else {
        input.raw.clone()
    };

    let Ok(config) = toml::from_str::<ConfigFile>(&text) else {
        return;
    };

    if let Ok(rules) = compile_rules(&config.rule) {
        assert_eq!(rules.len(), config.rule.len());
    }

    // Whatever parsed must serialize back.
    let _ = toml::to_string(&config);
});
