//! Declarative conditions compiled against the property schema of each scope.

use regex::Regex;

use modelbpa_types::{Condition, PropertyValue, ScopeName};

use crate::object::{ObjectRef, PredicateError, PropertyKind, property_kind};

#[derive(Debug, thiserror::Error)]
pub enum ConditionCompileError {
    #[error("property '{property}' is not defined for scope '{scope}'")]
    UnknownProperty { scope: ScopeName, property: String },

    #[error("property '{property}' of scope '{scope}' is {kind}; '{op}' needs {expected}")]
    IncompatibleOperator {
        scope: ScopeName,
        property: String,
        kind: &'static str,
        op: &'static str,
        expected: &'static str,
    },

    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

/// A [`Condition`] with regexes built and property names checked.
#[derive(Debug, Clone)]
pub enum CompiledCondition {
    All(Vec<CompiledCondition>),
    Any(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
    Eq { property: String, value: PropertyValue },
    Ne { property: String, value: PropertyValue },
    Gt { property: String, value: f64 },
    Lt { property: String, value: f64 },
    Matches { property: String, regex: Regex },
    Contains { property: String, needle: String, case_sensitive: bool },
    IsEmpty { property: String },
    Always,
}

/// Compile `condition` so that it can be evaluated against objects of every
/// scope in `scopes`.
pub fn compile_condition(
    condition: &Condition,
    scopes: &[ScopeName],
) -> Result<CompiledCondition, ConditionCompileError> {
    let compile_all = |of: &[Condition]| {
        of.iter()
            .map(|c| compile_condition(c, scopes))
            .collect::<Result<Vec<_>, _>>()
    };

    Ok(match condition {
        Condition::All { of } => CompiledCondition::All(compile_all(of)?),
        Condition::Any { of } => CompiledCondition::Any(compile_all(of)?),
        Condition::Not { condition } => {
            CompiledCondition::Not(Box::new(compile_condition(condition, scopes)?))
        }
        Condition::Eq { property, value } => {
            check(scopes, property, "eq", literal_fits(value))?;
            CompiledCondition::Eq {
                property: property.clone(),
                value: value.clone(),
            }
        }
        Condition::Ne { property, value } => {
            check(scopes, property, "ne", literal_fits(value))?;
            CompiledCondition::Ne {
                property: property.clone(),
                value: value.clone(),
            }
        }
        Condition::Gt { property, value } => {
            check(scopes, property, "gt", numeric)?;
            CompiledCondition::Gt {
                property: property.clone(),
                value: *value,
            }
        }
        Condition::Lt { property, value } => {
            check(scopes, property, "lt", numeric)?;
            CompiledCondition::Lt {
                property: property.clone(),
                value: *value,
            }
        }
        Condition::Matches { property, pattern } => {
            check(scopes, property, "matches", textual)?;
            let regex = Regex::new(pattern).map_err(|source| ConditionCompileError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })?;
            CompiledCondition::Matches {
                property: property.clone(),
                regex,
            }
        }
        Condition::Contains {
            property,
            value,
            case_sensitive,
        } => {
            check(scopes, property, "contains", textual)?;
            CompiledCondition::Contains {
                property: property.clone(),
                needle: value.clone(),
                case_sensitive: *case_sensitive,
            }
        }
        Condition::IsEmpty { property } => {
            check(scopes, property, "is_empty", |_| Ok(()))?;
            CompiledCondition::IsEmpty {
                property: property.clone(),
            }
        }
        Condition::Always => CompiledCondition::Always,
    })
}

type KindCheck = fn(PropertyKind) -> Result<(), &'static str>;

fn numeric(kind: PropertyKind) -> Result<(), &'static str> {
    match kind {
        PropertyKind::Int => Ok(()),
        _ => Err("an int property"),
    }
}

fn boolean(kind: PropertyKind) -> Result<(), &'static str> {
    match kind {
        PropertyKind::Bool => Ok(()),
        _ => Err("a bool property"),
    }
}

fn textual(kind: PropertyKind) -> Result<(), &'static str> {
    match kind {
        PropertyKind::Text => Ok(()),
        _ => Err("a text property"),
    }
}

fn literal_fits(value: &PropertyValue) -> KindCheck {
    match value {
        PropertyValue::Bool(_) => boolean,
        PropertyValue::Int(_) | PropertyValue::Float(_) => numeric,
        PropertyValue::Text(_) => textual,
    }
}

fn check(
    scopes: &[ScopeName],
    property: &str,
    op: &'static str,
    fits: impl Fn(PropertyKind) -> Result<(), &'static str>,
) -> Result<(), ConditionCompileError> {
    for scope in scopes {
        let Some(kind) = property_kind(*scope, property) else {
            return Err(ConditionCompileError::UnknownProperty {
                scope: *scope,
                property: property.to_string(),
            });
        };
        if let Err(expected) = fits(kind) {
            return Err(ConditionCompileError::IncompatibleOperator {
                scope: *scope,
                property: property.to_string(),
                kind: kind.as_str(),
                op,
                expected,
            });
        }
    }
    Ok(())
}

impl CompiledCondition {
    pub fn evaluate(&self, object: &ObjectRef<'_>) -> Result<bool, PredicateError> {
        match self {
            CompiledCondition::All(of) => {
                for c in of {
                    if !c.evaluate(object)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            CompiledCondition::Any(of) => {
                for c in of {
                    if c.evaluate(object)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            CompiledCondition::Not(c) => Ok(!c.evaluate(object)?),
            CompiledCondition::Eq { property, value } => {
                Ok(object.property(property)?.is_some_and(|v| values_equal(&v, value)))
            }
            CompiledCondition::Ne { property, value } => {
                Ok(!object.property(property)?.is_some_and(|v| values_equal(&v, value)))
            }
            CompiledCondition::Gt { property, value } => {
                Ok(number(object, property)?.is_some_and(|n| n > *value))
            }
            CompiledCondition::Lt { property, value } => {
                Ok(number(object, property)?.is_some_and(|n| n < *value))
            }
            CompiledCondition::Matches { property, regex } => {
                Ok(string(object, property)?.is_some_and(|s| regex.is_match(&s)))
            }
            CompiledCondition::Contains {
                property,
                needle,
                case_sensitive,
            } => Ok(string(object, property)?.is_some_and(|s| {
                if *case_sensitive {
                    s.contains(needle.as_str())
                } else {
                    s.to_lowercase().contains(&needle.to_lowercase())
                }
            })),
            CompiledCondition::IsEmpty { property } => Ok(match object.property(property)? {
                None => true,
                Some(PropertyValue::Text(s)) => s.trim().is_empty(),
                Some(_) => false,
            }),
            CompiledCondition::Always => Ok(true),
        }
    }
}

fn values_equal(actual: &PropertyValue, expected: &PropertyValue) -> bool {
    match (actual, expected) {
        (PropertyValue::Text(a), PropertyValue::Text(b)) => a == b,
        (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn number(object: &ObjectRef<'_>, property: &str) -> Result<Option<f64>, PredicateError> {
    match object.property(property)? {
        None => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or(PredicateError::TypeMismatch {
            property: property.to_string(),
            expected: "number",
            found: v.type_name(),
        }),
    }
}

fn string(object: &ObjectRef<'_>, property: &str) -> Result<Option<String>, PredicateError> {
    match object.property(property)? {
        None => Ok(None),
        Some(PropertyValue::Text(s)) => Ok(Some(s)),
        Some(v) => Err(PredicateError::TypeMismatch {
            property: property.to_string(),
            expected: "text",
            found: v.type_name(),
        }),
    }
}
