//! Scope registry: which objects each scope enumerates and how they are named.

use std::fmt;

use modelbpa_model::SemanticModel;
use modelbpa_types::ScopeName;

use crate::object::{ObjectKind, ObjectRef, qualified_name};
use crate::rules::CompiledRule;

pub type Collector<'m> = Box<dyn Fn() -> Vec<ObjectRef<'m>> + Send + Sync + 'm>;
pub type Namer = fn(&ObjectRef<'_>) -> String;

const SCOPE_COUNT: usize = ScopeName::ALL.len();

#[derive(Debug, thiserror::Error)]
#[error("no registry entry for scope '{scope}'{}", rule_suffix(.rule_name))]
pub struct UnknownScopeError {
    pub scope: ScopeName,
    pub rule_name: Option<String>,
}

fn rule_suffix(rule_name: &Option<String>) -> String {
    match rule_name {
        Some(name) => format!(" (referenced by rule '{name}')"),
        None => String::new(),
    }
}

/// How one scope's objects are enumerated and named.
pub struct ScopeEntry<'m> {
    collect: Collector<'m>,
    name: Namer,
}

impl<'m> ScopeEntry<'m> {
    pub fn new(collect: Collector<'m>, name: Namer) -> Self {
        Self { collect, name }
    }

    /// Enumerate the scope's objects in model declaration order.
    pub fn collect(&self) -> Vec<ObjectRef<'m>> {
        (self.collect)()
    }

    pub fn name(&self, object: &ObjectRef<'_>) -> String {
        (self.name)(object)
    }
}

impl fmt::Debug for ScopeEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeEntry").finish_non_exhaustive()
    }
}

/// A fixed table keyed by [`ScopeName`]. Lookups are total over the scopes
/// that have been registered; everything else is an [`UnknownScopeError`].
#[derive(Debug, Default)]
pub struct ScopeRegistry<'m> {
    entries: [Option<ScopeEntry<'m>>; SCOPE_COUNT],
}

impl<'m> ScopeRegistry<'m> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard registry over every scope of `model`.
    pub fn for_model(model: &'m SemanticModel) -> Self {
        let mut registry = Self::empty();
        let obj = move |kind: ObjectKind<'m>| ObjectRef::new(model, kind);

        registry.register(
            ScopeName::Model,
            ScopeEntry::new(Box::new(move || vec![obj(ObjectKind::Model)]), qualified_name),
        );
        registry.register(
            ScopeName::Table,
            ScopeEntry::new(
                Box::new(move || model.tables.iter().map(|t| obj(ObjectKind::Table(t))).collect()),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::Column,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .all_columns()
                        .map(|(t, c)| obj(ObjectKind::Column(t, c)))
                        .collect()
                }),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::Measure,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .all_measures()
                        .map(|(t, m)| obj(ObjectKind::Measure(t, m)))
                        .collect()
                }),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::Hierarchy,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .all_hierarchies()
                        .map(|(t, h)| obj(ObjectKind::Hierarchy(t, h)))
                        .collect()
                }),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::Relationship,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .relationships
                        .iter()
                        .map(|r| obj(ObjectKind::Relationship(r)))
                        .collect()
                }),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::Role,
            ScopeEntry::new(
                Box::new(move || model.roles.iter().map(|r| obj(ObjectKind::Role(r))).collect()),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::Partition,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .all_partitions()
                        .map(|(t, p)| obj(ObjectKind::Partition(t, p)))
                        .collect()
                }),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::RowLevelSecurity,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .all_rls()
                        .map(|(r, p)| obj(ObjectKind::RowLevelSecurity(r, p)))
                        .collect()
                }),
                qualified_name,
            ),
        );
        registry.register(
            ScopeName::CalculationItem,
            ScopeEntry::new(
                Box::new(move || {
                    model
                        .all_calculation_items()
                        .map(|(t, i)| obj(ObjectKind::CalculationItem(t, i)))
                        .collect()
                }),
                qualified_name,
            ),
        );

        registry
    }

    /// Install (or replace) the entry for `scope`, returning the previous one.
    pub fn register(&mut self, scope: ScopeName, entry: ScopeEntry<'m>) -> Option<ScopeEntry<'m>> {
        self.entries[scope.index()].replace(entry)
    }

    pub fn lookup(&self, scope: ScopeName) -> Result<&ScopeEntry<'m>, UnknownScopeError> {
        self.entries[scope.index()]
            .as_ref()
            .ok_or(UnknownScopeError {
                scope,
                rule_name: None,
            })
    }

    pub fn contains(&self, scope: ScopeName) -> bool {
        self.entries[scope.index()].is_some()
    }

    /// Registered scopes in declaration order.
    pub fn scopes(&self) -> impl Iterator<Item = ScopeName> + '_ {
        ScopeName::ALL.into_iter().filter(|s| self.contains(*s))
    }

    /// Check that every scope referenced by `rules` has an entry.
    pub fn validate(&self, rules: &[CompiledRule]) -> Result<(), UnknownScopeError> {
        for rule in rules {
            for scope in &rule.scopes {
                if !self.contains(*scope) {
                    return Err(UnknownScopeError {
                        scope: *scope,
                        rule_name: Some(rule.meta.name.clone()),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelbpa_testkit::fixtures;

    #[test]
    fn standard_registry_covers_every_scope() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        assert_eq!(registry.scopes().count(), ScopeName::ALL.len());
        for scope in ScopeName::ALL {
            let entry = registry.lookup(scope).unwrap();
            for obj in entry.collect() {
                assert_eq!(obj.scope(), scope);
            }
        }
    }

    #[test]
    fn model_scope_yields_exactly_one_object() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let objects = registry.lookup(ScopeName::Model).unwrap().collect();
        assert_eq!(objects.len(), 1);
        assert_eq!(registry.lookup(ScopeName::Model).unwrap().name(&objects[0]), "Model");
    }

    #[test]
    fn column_names_are_table_qualified() {
        let model = fixtures::sample_model();
        let registry = ScopeRegistry::for_model(&model);
        let entry = registry.lookup(ScopeName::Column).unwrap();
        let names: Vec<_> = entry.collect().iter().map(|o| entry.name(o)).collect();
        assert!(names.contains(&"Table1[A]".to_string()));
    }

    #[test]
    fn empty_registry_reports_unknown_scope() {
        let registry = ScopeRegistry::empty();
        let err = registry.lookup(ScopeName::Measure).unwrap_err();
        assert_eq!(err.scope, ScopeName::Measure);
        assert_eq!(err.to_string(), "no registry entry for scope 'Measure'");
    }

    #[test]
    fn register_replaces_previous_entry() {
        let model = fixtures::sample_model();
        let mut registry = ScopeRegistry::empty();
        let first = ScopeEntry::new(Box::new(Vec::new), qualified_name);
        assert!(registry.register(ScopeName::Table, first).is_none());
        let second = ScopeEntry::new(
            Box::new(|| model.tables.iter().map(|t| ObjectRef::new(&model, ObjectKind::Table(t))).collect()),
            qualified_name,
        );
        assert!(registry.register(ScopeName::Table, second).is_some());
        assert_eq!(
            registry.lookup(ScopeName::Table).unwrap().collect().len(),
            model.tables.len()
        );
    }
}
