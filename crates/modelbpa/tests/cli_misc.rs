use assert_cmd::Command;
use assert_cmd::cargo;
use modelbpa_types::ConfigFile;
use tempfile::TempDir;

fn modelbpa_cmd() -> Command {
    Command::new(cargo::cargo_bin!("modelbpa"))
}

fn write_config(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("modelbpa.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}

const CUSTOM_RULE: &str = r#"
[[rule]]
name = "Hidden tables need a reason"
category = "Maintenance"
severity = "info"
scopes = ["Table"]
description = "Explain why the table is hidden."
condition = { op = "all", of = [{ op = "eq", property = "is_hidden", value = true }, { op = "is_empty", property = "description" }] }
"#;

#[test]
fn rules_outputs_toml_and_json() {
    let td = TempDir::new().expect("temp");
    let config_path = write_config(td.path(), CUSTOM_RULE);

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("rules")
        .arg("--config")
        .arg(&config_path)
        .arg("--no-default-rules")
        .output()
        .expect("run");
    assert!(output.status.success());
    let parsed: ConfigFile =
        toml::from_str(&String::from_utf8_lossy(&output.stdout)).expect("toml output");
    assert_eq!(parsed.rule.len(), 1);

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("rules")
        .arg("--config")
        .arg(&config_path)
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());
    let parsed: ConfigFile = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(parsed.rule.len(), ConfigFile::built_in().rule.len() + 1);
    assert_eq!(
        parsed.rule.last().map(|r| r.name.as_str()),
        Some("Hidden tables need a reason")
    );
}

#[test]
fn default_config_is_picked_up_from_working_directory() {
    let td = TempDir::new().expect("temp");
    write_config(td.path(), CUSTOM_RULE);

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("rules")
        .arg("--no-default-rules")
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());
    let parsed: ConfigFile = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(parsed.rule.len(), 1);
}

#[test]
fn explain_prints_rule_details() {
    let td = TempDir::new().expect("temp");

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("explain")
        .arg("Hide foreign keys")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Rule: Hide foreign keys"));
    assert!(stdout.contains("Applies to:"));
    assert!(stdout.contains("  - Column"));
}

#[test]
fn explain_unknown_rule_suggests_similar() {
    let td = TempDir::new().expect("temp");

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("explain")
        .arg("Hide foreign")
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
    assert!(stderr.contains("Hide foreign keys"));
}

#[test]
fn validate_accepts_a_good_config() {
    let td = TempDir::new().expect("temp");
    let config_path = write_config(td.path(), CUSTOM_RULE);

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("validate")
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration is valid!"));
}

#[test]
fn validate_reports_every_broken_rule() {
    let td = TempDir::new().expect("temp");
    let config_path = write_config(
        td.path(),
        r#"
[[rule]]
name = "dup"
category = "Test"
severity = "info"
scopes = ["Table"]
condition = { op = "always" }

[[rule]]
name = "dup"
category = "Test"
severity = "info"
scopes = ["Table"]
condition = { op = "always" }

[[rule]]
name = "bad regex"
category = "Test"
severity = "warning"
scopes = ["Measure"]
description = "x"
condition = { op = "matches", property = "expression", pattern = "(" }

[[rule]]
name = "unknown property"
category = "Test"
severity = "warning"
scopes = ["Column"]
description = "x"
condition = { op = "is_empty", property = "no_such_property" }

[[rule]]
name = "no scopes"
category = "Test"
severity = "warning"
scopes = []
description = "x"
condition = { op = "always" }
"#,
    );

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("validate")
        .arg("--config")
        .arg(&config_path)
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(result["valid"], false);
    let errors: Vec<String> = result["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|e| e.as_str().map(str::to_string))
        .collect();
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("duplicate rule name")));
    assert!(errors.iter().any(|e| e.starts_with("Rule 'bad regex'")));
    assert!(errors.iter().any(|e| e.starts_with("Rule 'unknown property'")));
    assert!(errors.iter().any(|e| e.contains("no scopes defined")));
}

#[test]
fn validate_without_config_is_an_error() {
    let td = TempDir::new().expect("temp");

    modelbpa_cmd()
        .current_dir(td.path())
        .arg("validate")
        .assert()
        .code(1);
}

#[test]
fn config_expands_environment_variables() {
    let td = TempDir::new().expect("temp");
    let config_path = write_config(
        td.path(),
        r#"
[defaults]
language = "${MODELBPA_CLI_TEST_LANG:-de-DE}"
"#,
    );

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .env("MODELBPA_CLI_TEST_LANG", "fr-FR")
        .arg("rules")
        .arg("--config")
        .arg(&config_path)
        .arg("--no-default-rules")
        .output()
        .expect("run");
    assert!(output.status.success());
    let parsed: ConfigFile =
        toml::from_str(&String::from_utf8_lossy(&output.stdout)).expect("toml output");
    assert_eq!(parsed.defaults.language.as_deref(), Some("fr-FR"));
}

#[test]
fn history_of_an_absent_store_is_empty() {
    let td = TempDir::new().expect("temp");

    let output = modelbpa_cmd()
        .current_dir(td.path())
        .arg("history")
        .arg(td.path().join("none.jsonl"))
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Runs: 0"));
}
