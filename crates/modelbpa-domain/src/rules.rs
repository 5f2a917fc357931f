use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use modelbpa_types::{Condition, RuleConfig, RuleMeta, ScopeName};

use crate::condition::{CompiledCondition, ConditionCompileError, compile_condition};
use crate::object::{ObjectRef, PredicateError};

#[derive(Debug, thiserror::Error)]
pub enum RuleCompileError {
    #[error("rule '{rule_name}' has no scopes")]
    MissingScopes { rule_name: String },

    #[error("rule '{rule_name}' has an empty name")]
    EmptyName { rule_name: String },

    #[error("rule '{rule_name}': {source}")]
    Condition {
        rule_name: String,
        source: ConditionCompileError,
    },
}

pub type NativePredicate =
    Arc<dyn Fn(&ObjectRef<'_>) -> Result<bool, PredicateError> + Send + Sync>;

/// The test a rule applies to each object in its scopes.
#[derive(Clone)]
pub enum Predicate {
    /// Compiled from a declarative [`Condition`]; the source is kept for display.
    Condition {
        source: Condition,
        compiled: Arc<CompiledCondition>,
    },
    /// Supplied directly by an embedding program.
    Native(NativePredicate),
}

impl Predicate {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef<'_>) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Predicate::Native(Arc::new(f))
    }

    pub fn evaluate(&self, object: &ObjectRef<'_>) -> Result<bool, PredicateError> {
        match self {
            Predicate::Condition { compiled, .. } => compiled.evaluate(object),
            Predicate::Native(f) => f(object),
        }
    }

    /// Whether two predicates are the same compiled instance.
    pub fn same_as(&self, other: &Predicate) -> bool {
        match (self, other) {
            (Predicate::Condition { compiled: a, .. }, Predicate::Condition { compiled: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (Predicate::Native(a), Predicate::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Predicate::Condition { source, .. } => Some(source),
            Predicate::Native(_) => None,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Condition { source, .. } => f.debug_tuple("Condition").field(source).finish(),
            Predicate::Native(_) => f.write_str("Native(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub meta: RuleMeta,
    /// Ordered, without duplicates.
    pub scopes: Vec<ScopeName>,
    pub predicate: Predicate,
}

impl CompiledRule {
    pub fn new(
        meta: RuleMeta,
        scopes: impl IntoIterator<Item = ScopeName>,
        predicate: Predicate,
    ) -> Result<Self, RuleCompileError> {
        if meta.name.trim().is_empty() {
            return Err(RuleCompileError::EmptyName {
                rule_name: meta.name,
            });
        }

        let mut seen = BTreeSet::new();
        let scopes: Vec<ScopeName> = scopes.into_iter().filter(|s| seen.insert(*s)).collect();
        if scopes.is_empty() {
            return Err(RuleCompileError::MissingScopes {
                rule_name: meta.name,
            });
        }

        Ok(Self {
            meta,
            scopes,
            predicate,
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

pub fn compile_rules(configs: &[RuleConfig]) -> Result<Vec<CompiledRule>, RuleCompileError> {
    let mut out = Vec::with_capacity(configs.len());

    for cfg in configs {
        if cfg.scopes.is_empty() {
            return Err(RuleCompileError::MissingScopes {
                rule_name: cfg.name.clone(),
            });
        }

        let compiled = compile_condition(&cfg.condition, &cfg.scopes).map_err(|source| {
            RuleCompileError::Condition {
                rule_name: cfg.name.clone(),
                source,
            }
        })?;

        out.push(CompiledRule::new(
            RuleMeta::from(cfg),
            cfg.scopes.iter().copied(),
            Predicate::Condition {
                source: cfg.condition.clone(),
                compiled: Arc::new(compiled),
            },
        )?);
    }

    Ok(out)
}

/// Rule names that occur more than once, in first-occurrence order.
pub fn duplicate_rule_names(rules: &[CompiledRule]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    let mut out = Vec::new();
    for rule in rules {
        if !seen.insert(rule.name()) && reported.insert(rule.name()) {
            out.push(rule.name().to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelbpa_types::{ConfigFile, Severity};

    fn rule(name: &str, scopes: Vec<ScopeName>, condition: Condition) -> RuleConfig {
        RuleConfig {
            name: name.to_string(),
            category: "Performance".to_string(),
            severity: Severity::Warning,
            scopes,
            description: String::new(),
            url: None,
            condition,
        }
    }

    #[test]
    fn built_in_catalog_compiles() {
        let rules = compile_rules(&ConfigFile::built_in().rule).unwrap();
        assert_eq!(rules.len(), ConfigFile::built_in().rule.len());
    }

    #[test]
    fn empty_scopes_are_rejected() {
        let err = compile_rules(&[rule("r", vec![], Condition::Always)]).unwrap_err();
        assert!(matches!(err, RuleCompileError::MissingScopes { .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = compile_rules(&[rule("  ", vec![ScopeName::Table], Condition::Always)]).unwrap_err();
        assert!(matches!(err, RuleCompileError::EmptyName { .. }));
    }

    #[test]
    fn condition_errors_carry_rule_name() {
        let cond = Condition::IsEmpty {
            property: "nope".to_string(),
        };
        let err = compile_rules(&[rule("bad", vec![ScopeName::Table], cond)]).unwrap_err();
        assert!(err.to_string().starts_with("rule 'bad':"));
    }

    #[test]
    fn scopes_are_deduplicated_in_order() {
        let rules = compile_rules(&[rule(
            "r",
            vec![ScopeName::Measure, ScopeName::Table, ScopeName::Measure],
            Condition::Always,
        )])
        .unwrap();
        assert_eq!(rules[0].scopes, vec![ScopeName::Measure, ScopeName::Table]);
    }

    #[test]
    fn clones_share_predicate() {
        let rules = compile_rules(&[rule("r", vec![ScopeName::Table], Condition::Always)]).unwrap();
        let copy = rules[0].clone();
        assert!(copy.predicate.same_as(&rules[0].predicate));

        let other = compile_rules(&[rule("r", vec![ScopeName::Table], Condition::Always)]).unwrap();
        assert!(!other[0].predicate.same_as(&rules[0].predicate));
    }

    #[test]
    fn duplicate_names_reported_once() {
        let rules = compile_rules(&[
            rule("a", vec![ScopeName::Table], Condition::Always),
            rule("b", vec![ScopeName::Table], Condition::Always),
            rule("a", vec![ScopeName::Table], Condition::Always),
            rule("a", vec![ScopeName::Table], Condition::Always),
        ])
        .unwrap();
        assert_eq!(duplicate_rule_names(&rules), vec!["a".to_string()]);
    }
}
