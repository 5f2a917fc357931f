//! Configuration loading with include resolution.
//!
//! - `includes` composes a config from other files, relative to the including file
//! - circular includes and chains deeper than [`MAX_INCLUDE_DEPTH`] are rejected
//! - rules merge by name: a later definition replaces an earlier one in place

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use modelbpa_types::{ConfigFile, Defaults, RuleConfig};

const MAX_INCLUDE_DEPTH: usize = 10;

/// Load `path` and everything it includes. `expand_env` runs on each file's
/// text before it is parsed.
pub fn load_config_with_includes<F>(path: &Path, expand_env: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    let mut visited = HashSet::new();
    load_config_recursive(path, expand_env, &mut visited, 0)
}

fn load_config_recursive<F>(
    path: &Path,
    expand_env: F,
    visited: &mut HashSet<PathBuf>,
    depth: usize,
) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    if depth > MAX_INCLUDE_DEPTH {
        bail!(
            "Include depth exceeded maximum of {} levels at '{}'",
            MAX_INCLUDE_DEPTH,
            path.display()
        );
    }

    let canonical = path
        .canonicalize()
        .with_context(|| format!("canonicalize path '{}'", path.display()))?;
    if !visited.insert(canonical) {
        bail!("Circular include detected: '{}'", path.display());
    }

    debug!("Loading config from '{}' (depth {})", path.display(), depth);

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let expanded = expand_env(&text)?;
    let config: ConfigFile =
        toml::from_str(&expanded).with_context(|| format!("parse config '{}'", path.display()))?;

    if config.includes.is_empty() {
        return Ok(config);
    }

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let mut merged = ConfigFile::empty();

    for include_path in &config.includes {
        let full_path = base_dir.join(include_path);
        if !full_path.exists() {
            bail!(
                "Included config file not found: '{}' (resolved from '{}')",
                full_path.display(),
                include_path
            );
        }
        let included = load_config_recursive(&full_path, expand_env, visited, depth + 1)?;
        merged = merge_configs(merged, included);
    }

    // The including file wins over everything it includes.
    let main_without_includes = ConfigFile {
        includes: vec![],
        defaults: config.defaults,
        rule: config.rule,
    };
    Ok(merge_configs(merged, main_without_includes))
}

/// Merge two configs. Rules from `other` replace same-named rules from `base`
/// at their original position; new rules are appended.
pub fn merge_configs(base: ConfigFile, other: ConfigFile) -> ConfigFile {
    let defaults = if other.defaults != Defaults::default() {
        other.defaults
    } else {
        base.defaults
    };

    ConfigFile {
        includes: vec![],
        defaults,
        rule: merge_rules(base.rule, other.rule),
    }
}

pub fn merge_rules(base: Vec<RuleConfig>, other: Vec<RuleConfig>) -> Vec<RuleConfig> {
    let mut rules = base;
    for rule in other {
        match rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }
    rules
}
