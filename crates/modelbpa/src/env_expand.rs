//! Environment variable expansion for configuration files.
//!
//! Expansion happens on the raw TOML text before parsing:
//!
//! - `${VAR}` is replaced with the value of VAR (an error if unset)
//! - `${VAR:-default}` uses "default" when VAR is unset or empty
//!
//! A `$` that is not followed by `{` is left alone, so DAX and regex text
//! such as `$pattern` passes through unchanged.

use std::borrow::Cow;

use anyhow::{Result, bail};
use tracing::debug;

pub fn expand_env_vars(text: &str) -> Result<Cow<'_, str>> {
    if !text.contains("${") {
        return Ok(Cow::Borrowed(text));
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' || !matches!(chars.peek(), Some(&(_, '{'))) {
            result.push(c);
            continue;
        }
        chars.next();

        let mut var_content = String::new();
        let mut found_close = false;
        let mut depth = 1;
        for (_, ch) in chars.by_ref() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        found_close = true;
                        break;
                    }
                }
                _ => {}
            }
            var_content.push(ch);
        }

        if !found_close {
            let preview: String = var_content.chars().take(20).collect();
            bail!(
                "Unclosed environment variable reference starting at position {}: ${{{}...",
                i,
                preview
            );
        }

        result.push_str(&expand_single_var(&var_content)?);
    }

    Ok(Cow::Owned(result))
}

fn expand_single_var(content: &str) -> Result<String> {
    if let Some((var_name, default_value)) = content.split_once(":-") {
        validate_var_name(var_name)?;
        return match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {
                debug!("Expanded env var ${{{}}}", var_name);
                Ok(val)
            }
            _ => {
                debug!("Env var ${{{}}} not set, using default", var_name);
                Ok(default_value.to_string())
            }
        };
    }

    validate_var_name(content)?;
    match std::env::var(content) {
        Ok(val) => Ok(val),
        Err(_) => bail!(
            "Environment variable '{}' is not set. \
             Use ${{{}:-default}} syntax to provide a default value.",
            content,
            content
        ),
    }
}

fn validate_var_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        bail!("Empty environment variable name in ${{}}");
    };
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        bail!(
            "Invalid environment variable name '{}': must start with a letter or underscore",
            name
        );
    }
    if let Some(c) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        bail!(
            "Invalid environment variable name '{}': contains invalid character '{}'",
            name,
            c
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.
    fn set(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn unset(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    #[test]
    fn no_expansion_borrows() {
        let input = "language = \"it-IT\"";
        let result = expand_env_vars(input).unwrap();
        assert_eq!(result, input);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn basic_expansion() {
        set("MODELBPA_TEST_WS", "Finance");
        let result = expand_env_vars("workspace = \"${MODELBPA_TEST_WS}\"").unwrap();
        assert_eq!(result, "workspace = \"Finance\"");
        unset("MODELBPA_TEST_WS");
    }

    #[test]
    fn default_when_unset_or_empty() {
        unset("MODELBPA_TEST_UNSET");
        let result = expand_env_vars("language = \"${MODELBPA_TEST_UNSET:-de-DE}\"").unwrap();
        assert_eq!(result, "language = \"de-DE\"");

        set("MODELBPA_TEST_EMPTY", "");
        let result = expand_env_vars("x = \"${MODELBPA_TEST_EMPTY:-fallback}\"").unwrap();
        assert_eq!(result, "x = \"fallback\"");
        unset("MODELBPA_TEST_EMPTY");
    }

    #[test]
    fn default_may_contain_colons() {
        unset("MODELBPA_TEST_URL");
        let result =
            expand_env_vars("url = \"${MODELBPA_TEST_URL:-https://example.com:8443/x}\"").unwrap();
        assert_eq!(result, "url = \"https://example.com:8443/x\"");
    }

    #[test]
    fn missing_required_var_is_an_error() {
        unset("MODELBPA_TEST_REQUIRED");
        let err = expand_env_vars("x = \"${MODELBPA_TEST_REQUIRED}\"")
            .unwrap_err()
            .to_string();
        assert!(err.contains("MODELBPA_TEST_REQUIRED"));
        assert!(err.contains("not set"));
    }

    #[test]
    fn malformed_references() {
        let err = expand_env_vars("x = \"${UNCLOSED").unwrap_err().to_string();
        assert!(err.contains("Unclosed"));
        let err = expand_env_vars("x = \"${}\"").unwrap_err().to_string();
        assert!(err.contains("Empty"));
        let err = expand_env_vars("x = \"${1VAR}\"").unwrap_err().to_string();
        assert!(err.contains("Invalid"));
        let err = expand_env_vars("x = \"${VAR-NAME}\"").unwrap_err().to_string();
        assert!(err.contains("Invalid"));
    }

    #[test]
    fn bare_dollar_is_preserved() {
        let input = "pattern = \"$Total|$$\"";
        assert_eq!(expand_env_vars(input).unwrap(), input);
    }
}
