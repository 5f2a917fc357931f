use rayon::prelude::*;
use tracing::{debug, warn};

use modelbpa_types::{Diagnostic, DiagnosticKind, MODEL_OBJECT_NAME, ScopeName, Violation};

use crate::object::PredicateError;
use crate::registry::{ScopeEntry, ScopeRegistry, UnknownScopeError};
use crate::rules::CompiledRule;

#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
    #[error(transparent)]
    UnknownScope(#[from] UnknownScopeError),

    #[error("failed to start evaluation workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Ordered by rule, then scope (as listed on the rule), then object.
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Diagnostic>,
    pub rules_evaluated: u32,
    /// (rule, scope) pairs that completed without a predicate error.
    pub units_completed: u32,
    pub units_failed: u32,
}

/// Evaluate every rule against every object of each of its scopes.
///
/// A predicate that fails on any object discards the results of that
/// (rule, scope) pair and records a diagnostic; other pairs are unaffected.
pub fn evaluate(
    rules: &[CompiledRule],
    registry: &ScopeRegistry<'_>,
) -> Result<Evaluation, EvaluateError> {
    registry.validate(rules)?;
    let units = units(rules);
    let outcomes = units
        .iter()
        .map(|(rule, scope)| evaluate_unit(rule, *scope, registry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fold(rules.len(), outcomes))
}

/// Same result as [`evaluate`], with (rule, scope) pairs spread over at most
/// `concurrency` worker threads. Output order does not depend on scheduling.
pub fn evaluate_parallel(
    rules: &[CompiledRule],
    registry: &ScopeRegistry<'_>,
    concurrency: usize,
) -> Result<Evaluation, EvaluateError> {
    if concurrency <= 1 {
        return evaluate(rules, registry);
    }
    registry.validate(rules)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .thread_name(|i| format!("modelbpa-eval-{i}"))
        .build()?;

    let units = units(rules);
    let outcomes = pool.install(|| {
        units
            .par_iter()
            .map(|(rule, scope)| evaluate_unit(rule, *scope, registry))
            .collect::<Result<Vec<_>, _>>()
    })?;
    Ok(fold(rules.len(), outcomes))
}

fn units(rules: &[CompiledRule]) -> Vec<(&CompiledRule, ScopeName)> {
    rules
        .iter()
        .flat_map(|rule| rule.scopes.iter().map(move |scope| (rule, *scope)))
        .collect()
}

struct UnitOutcome {
    rule_name: String,
    scope: ScopeName,
    result: Result<Vec<Violation>, PredicateError>,
}

fn evaluate_unit(
    rule: &CompiledRule,
    scope: ScopeName,
    registry: &ScopeRegistry<'_>,
) -> Result<UnitOutcome, UnknownScopeError> {
    let entry = registry.lookup(scope)?;
    Ok(UnitOutcome {
        rule_name: rule.meta.name.clone(),
        scope,
        result: run_unit(rule, scope, entry),
    })
}

fn run_unit(
    rule: &CompiledRule,
    scope: ScopeName,
    entry: &ScopeEntry<'_>,
) -> Result<Vec<Violation>, PredicateError> {
    let mut objects = entry.collect();
    if scope == ScopeName::Model {
        // The model itself is a single object, whatever the collector yields.
        objects.truncate(1);
    }

    let mut out = Vec::new();
    for object in &objects {
        if rule.predicate.evaluate(object)? {
            let object_name = if scope == ScopeName::Model {
                MODEL_OBJECT_NAME.to_string()
            } else {
                entry.name(object)
            };
            out.push(Violation {
                object_name,
                scope,
                rule_name: rule.meta.name.clone(),
            });
        }
    }
    Ok(out)
}

fn fold(rule_count: usize, outcomes: Vec<UnitOutcome>) -> Evaluation {
    let mut eval = Evaluation {
        rules_evaluated: u32::try_from(rule_count).unwrap_or(u32::MAX),
        ..Evaluation::default()
    };

    for outcome in outcomes {
        match outcome.result {
            Ok(violations) => {
                eval.units_completed += 1;
                eval.violations.extend(violations);
            }
            Err(err) => {
                warn!(
                    "Rule '{}' failed on scope '{}': {}",
                    outcome.rule_name, outcome.scope, err
                );
                eval.units_failed += 1;
                eval.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::PredicateError, err.to_string())
                        .with_rule(outcome.rule_name)
                        .with_scope(outcome.scope),
                );
            }
        }
    }

    debug!(
        "Evaluated {} rule(s): {} violation(s), {} failed unit(s)",
        eval.rules_evaluated,
        eval.violations.len(),
        eval.units_failed
    );
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectKind, ObjectRef, qualified_name};
    use crate::registry::ScopeEntry;
    use crate::rules::{Predicate, compile_rules};
    use modelbpa_testkit::fixtures;
    use modelbpa_types::{Condition, PropertyValue, RuleConfig, RuleMeta, Severity};

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

    fn eq(property: &str, value: impl Into<PropertyValue>) -> Condition {
        Condition::Eq {
            property: property.to_string(),
            value: value.into(),
        }
    }

    fn meta(name: &str) -> RuleMeta {
        RuleMeta {
            name: name.to_string(),
            category: "Test".to_string(),
            severity: Severity::Info,
            description: String::new(),
            url: None,
        }
    }

    #[test]
    fn float_column_is_flagged_with_qualified_name() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let rules = compile_rules(&[rule(
            "AvoidFloatColumn",
            vec![ScopeName::Column],
            eq("data_type", "Double"),
        )])
        .unwrap();

        let eval = evaluate(&rules, &registry).unwrap();
        assert_eq!(
            eval.violations,
            vec![Violation {
                object_name: "Table1[A]".to_string(),
                scope: ScopeName::Column,
                rule_name: "AvoidFloatColumn".to_string(),
            }]
        );
        assert!(eval.diagnostics.is_empty());
    }

    #[test]
    fn model_scope_yields_one_violation_named_model() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let rules = compile_rules(&[rule("Always", vec![ScopeName::Model], Condition::Always)]).unwrap();

        let eval = evaluate(&rules, &registry).unwrap();
        assert_eq!(eval.violations.len(), 1);
        assert_eq!(eval.violations[0].object_name, "Model");
        assert_eq!(eval.violations[0].scope, ScopeName::Model);
    }

    #[test]
    fn model_scope_ignores_extra_collected_objects() {
        let model = fixtures::sample_model();
        let mut registry = ScopeRegistry::empty();
        let m = &model;
        registry.register(
            ScopeName::Model,
            ScopeEntry::new(
                Box::new(move || {
                    vec![
                        ObjectRef::new(m, ObjectKind::Model),
                        ObjectRef::new(m, ObjectKind::Model),
                    ]
                }),
                qualified_name,
            ),
        );
        let rules = compile_rules(&[rule("Always", vec![ScopeName::Model], Condition::Always)]).unwrap();
        assert_eq!(evaluate(&rules, &registry).unwrap().violations.len(), 1);
    }

    #[test]
    fn multi_scope_rule_yields_one_row_per_scope() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let rules = compile_rules(&[rule(
            "Hidden",
            vec![ScopeName::Table, ScopeName::Column],
            eq("name", "Table1"),
        )])
        .unwrap();
        let eval = evaluate(&rules, &registry).unwrap();
        assert_eq!(eval.violations.len(), 1);
        assert_eq!(eval.violations[0].scope, ScopeName::Table);
    }

    #[test]
    fn unknown_scope_fails_before_any_evaluation() {
        let model = fixtures::sample_model();
        let mut registry = ScopeRegistry::empty();
        let m = &model;
        registry.register(
            ScopeName::Model,
            ScopeEntry::new(Box::new(move || vec![ObjectRef::new(m, ObjectKind::Model)]), qualified_name),
        );
        let rules = compile_rules(&[
            rule("ok", vec![ScopeName::Model], Condition::Always),
            rule("bad", vec![ScopeName::Measure], Condition::Always),
        ])
        .unwrap();

        let err = evaluate(&rules, &registry).unwrap_err();
        match err {
            EvaluateError::UnknownScope(e) => {
                assert_eq!(e.scope, ScopeName::Measure);
                assert_eq!(e.rule_name.as_deref(), Some("bad"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn predicate_failure_discards_only_that_unit() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);

        let failing = CompiledRule::new(
            meta("Broken"),
            [ScopeName::Table, ScopeName::Column],
            Predicate::native(|obj| match obj.scope() {
                ScopeName::Column => Err(PredicateError::Failed("boom".to_string())),
                _ => Ok(true),
            }),
        )
        .unwrap();
        let healthy = compile_rules(&[rule("Float", vec![ScopeName::Column], eq("data_type", "Double"))])
            .unwrap()
            .remove(0);

        let eval = evaluate(&[failing, healthy], &registry).unwrap();
        assert_eq!(eval.units_failed, 1);
        assert_eq!(eval.units_completed, 2);
        assert_eq!(eval.diagnostics.len(), 1);
        assert_eq!(eval.diagnostics[0].kind, DiagnosticKind::PredicateError);
        assert_eq!(eval.diagnostics[0].rule_name.as_deref(), Some("Broken"));
        assert_eq!(eval.diagnostics[0].scope, Some(ScopeName::Column));

        assert!(eval.violations.iter().all(|v| !(v.rule_name == "Broken" && v.scope == ScopeName::Column)));
        assert_eq!(
            eval.violations.iter().filter(|v| v.rule_name == "Broken").count(),
            model.tables.len()
        );
        assert!(eval.violations.iter().any(|v| v.rule_name == "Float"));
    }

    #[test]
    fn parallel_matches_sequential() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let rules = compile_rules(&modelbpa_types::ConfigFile::built_in().rule).unwrap();

        let seq = evaluate(&rules, &registry).unwrap();
        let par = evaluate_parallel(&rules, &registry, 4).unwrap();
        assert_eq!(seq, par);
        assert!(!seq.violations.is_empty());
    }

    #[test]
    fn no_rules_no_violations() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let eval = evaluate(&[], &registry).unwrap();
        assert!(eval.violations.is_empty());
        assert_eq!(eval.rules_evaluated, 0);
    }
}
