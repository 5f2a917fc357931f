//! Domain logic: scope registry, rule compilation, evaluation, translation.
//!
//! This crate is designed to be I/O-free and highly testable.

pub mod condition;
pub mod evaluate;
pub mod object;
pub mod registry;
pub mod rules;
pub mod translate;

pub use condition::{CompiledCondition, ConditionCompileError, compile_condition};
pub use evaluate::{EvaluateError, Evaluation, evaluate, evaluate_parallel};
pub use object::{
    ObjectKind, ObjectRef, PredicateError, PropertyKind, dax_object_name, properties,
    property_kind, qualified_name, quote_table,
};
pub use registry::{Collector, Namer, ScopeEntry, ScopeRegistry, UnknownScopeError};
pub use rules::{
    CompiledRule, NativePredicate, Predicate, RuleCompileError, compile_rules,
    duplicate_rule_names,
};
pub use translate::{
    BundledTableError, BundledTranslations, DEFAULT_TRANSLATION_CONCURRENCY, Overlay,
    SUPPORTED_LANGUAGES, TextField, TranslationError, TranslationOutcome, TranslationRequest,
    TranslationStrategy, Translator, apply_overlay, bundled_overlay, is_supported_language,
    live_overlay, translate_rules,
};
