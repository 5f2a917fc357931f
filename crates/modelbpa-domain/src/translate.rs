//! Localized rule text: a bundled lookup table and a live-translation fallback.
//!
//! Both strategies produce an [`Overlay`] keyed by the original rule name,
//! which [`apply_overlay`] merges into a copy of the catalog. Predicates,
//! scopes, severities and URLs are never touched.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};

use modelbpa_types::{Diagnostic, DiagnosticKind};

use crate::rules::CompiledRule;

/// Language codes with entries in the bundled table.
pub const SUPPORTED_LANGUAGES: [&str; 26] = [
    "it-IT", "es-ES", "he-IL", "pt-PT", "zh-CN", "fr-FR", "da-DK", "cs-CZ", "de-DE", "el-GR",
    "fa-IR", "ga-IE", "hi-IN", "hu-HU", "is-IS", "ja-JP", "nl-NL", "pl-PL", "pt-BR", "ru-RU",
    "te-IN", "ta-IN", "th-TH", "zu-ZA", "am-ET", "ar-AE",
];

/// Default bound on concurrent live-translation calls.
pub const DEFAULT_TRANSLATION_CONCURRENCY: usize = 5;

const BUNDLED_TOML: &str = include_str!("../translations/bundled.toml");

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES
        .iter()
        .any(|l| l.eq_ignore_ascii_case(code))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextField {
    Category,
    RuleName,
    Description,
}

impl TextField {
    pub const ALL: [TextField; 3] = [TextField::Category, TextField::RuleName, TextField::Description];

    pub fn as_str(self) -> &'static str {
        match self {
            TextField::Category => "category",
            TextField::RuleName => "rule_name",
            TextField::Description => "description",
        }
    }

    fn of(self, rule: &CompiledRule) -> &str {
        match self {
            TextField::Category => &rule.meta.category,
            TextField::RuleName => &rule.meta.name,
            TextField::Description => &rule.meta.description,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BundledTableError {
    #[error("invalid translation table: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("translation entry for rule '{rule}' has an empty language code")]
    MissingLanguage { rule: String },
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    entry: Vec<TableEntry>,
}

#[derive(Debug, Deserialize)]
struct TableEntry {
    rule: String,
    language: String,
    category: Option<String>,
    rule_name: Option<String>,
    description: Option<String>,
}

/// Static (rule name, field, language) → text table.
#[derive(Debug, Clone, Default)]
pub struct BundledTranslations {
    entries: BTreeMap<(String, TextField, String), String>,
}

impl BundledTranslations {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table shipped with the built-in catalog.
    pub fn built_in() -> Result<Self, BundledTableError> {
        Self::from_toml(BUNDLED_TOML)
    }

    pub fn from_toml(text: &str) -> Result<Self, BundledTableError> {
        let file: TableFile = toml::from_str(text)?;
        let mut out = Self::empty();
        for e in file.entry {
            if e.language.trim().is_empty() {
                return Err(BundledTableError::MissingLanguage { rule: e.rule });
            }
            let fields = [
                (TextField::Category, e.category),
                (TextField::RuleName, e.rule_name),
                (TextField::Description, e.description),
            ];
            for (field, text) in fields {
                if let Some(text) = text {
                    out.insert(&e.rule, field, &e.language, text);
                }
            }
        }
        Ok(out)
    }

    pub fn insert(&mut self, rule: &str, field: TextField, language: &str, text: String) {
        self.entries
            .insert((rule.to_string(), field, language.to_ascii_lowercase()), text);
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn merge(&mut self, other: BundledTranslations) {
        self.entries.extend(other.entries);
    }

    pub fn lookup(&self, rule: &str, field: TextField, language: &str) -> Option<&str> {
        self.entries
            .get(&(rule.to_string(), field, language.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("translation was cancelled")]
    Cancelled,

    #[error("translation service failed: {0}")]
    Service(String),
}

/// A machine-translation backend.
///
/// `translate_batch` receives one column of text and must return results
/// aligned with it; `None` (or a short result vector) means "no translation"
/// for that position.
pub trait Translator: Send + Sync {
    fn translate_batch(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<Option<String>>, TranslationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub language: String,
    /// Skip the bundled table and go straight to the live translator.
    pub skip_bundled: bool,
    pub concurrency: usize,
}

impl TranslationRequest {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            skip_bundled: false,
            concurrency: DEFAULT_TRANSLATION_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStrategy {
    Bundled,
    Live,
    Untranslated,
}

#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub rules: Vec<CompiledRule>,
    pub diagnostics: Vec<Diagnostic>,
    pub strategy: TranslationStrategy,
}

/// Translated text keyed by original rule name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    fields: BTreeMap<(String, TextField), String>,
}

impl Overlay {
    /// Record a translation. The first text for a (rule, field) pair wins.
    pub fn insert(&mut self, rule: &str, field: TextField, text: String) {
        self.fields.entry((rule.to_string(), field)).or_insert(text);
    }

    pub fn get(&self, rule: &str, field: TextField) -> Option<&str> {
        self.fields
            .get(&(rule.to_string(), field))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Copy `original`, replacing category, name and description wherever the
/// overlay has an entry for the rule's original name.
pub fn apply_overlay(original: &[CompiledRule], overlay: &Overlay) -> Vec<CompiledRule> {
    original
        .iter()
        .map(|rule| {
            let mut out = rule.clone();
            let name = rule.meta.name.as_str();
            if let Some(t) = overlay.get(name, TextField::Category) {
                out.meta.category = t.to_string();
            }
            if let Some(t) = overlay.get(name, TextField::RuleName) {
                out.meta.name = t.to_string();
            }
            if let Some(t) = overlay.get(name, TextField::Description) {
                out.meta.description = t.to_string();
            }
            out
        })
        .collect()
}

/// Overlay built from the bundled table for `language`.
pub fn bundled_overlay(
    rules: &[CompiledRule],
    bundled: &BundledTranslations,
    language: &str,
) -> Overlay {
    let mut overlay = Overlay::default();
    for rule in rules {
        for field in TextField::ALL {
            if let Some(text) = bundled.lookup(&rule.meta.name, field, language) {
                overlay.insert(&rule.meta.name, field, text.to_string());
            }
        }
    }
    overlay
}

/// Overlay built by calling `translator` once per text column. Columns run
/// concurrently, bounded by `concurrency`. A failed column contributes
/// nothing and yields a diagnostic.
pub fn live_overlay(
    rules: &[CompiledRule],
    translator: &dyn Translator,
    language: &str,
    concurrency: usize,
) -> (Overlay, Vec<Diagnostic>) {
    let columns: Vec<(TextField, Vec<String>)> = TextField::ALL
        .into_iter()
        .map(|field| (field, rules.iter().map(|r| field.of(r).to_string()).collect()))
        .collect();

    let call = |(field, texts): &(TextField, Vec<String>)| {
        (*field, translator.translate_batch(texts, language))
    };

    let results: Vec<(TextField, Result<Vec<Option<String>>, TranslationError>)> = match rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.clamp(1, TextField::ALL.len()))
        .build()
    {
        Ok(pool) => pool.install(|| columns.par_iter().map(call).collect()),
        Err(err) => {
            debug!("Translation pool unavailable ({err}); translating columns sequentially");
            columns.iter().map(call).collect()
        }
    };

    let mut overlay = Overlay::default();
    let mut diagnostics = Vec::new();
    for (field, result) in results {
        match result {
            Ok(translated) => {
                let mut missing = 0usize;
                for (i, rule) in rules.iter().enumerate() {
                    match translated.get(i).and_then(|t| t.as_deref()) {
                        Some(text) if !text.trim().is_empty() => {
                            overlay.insert(&rule.meta.name, field, text.to_string());
                        }
                        _ => missing += 1,
                    }
                }
                if missing > 0 {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TranslationUnavailable,
                        format!(
                            "{missing} {} value(s) were not translated to '{language}'",
                            field.as_str()
                        ),
                    ));
                }
            }
            Err(err) => {
                warn!("Translating {} to '{}' failed: {}", field.as_str(), language, err);
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::TranslationUnavailable,
                    format!("{} kept original text: {err}", field.as_str()),
                ));
            }
        }
    }
    (overlay, diagnostics)
}

/// Produce a localized copy of `rules`.
///
/// Supported languages use the bundled table unless `skip_bundled` is set.
/// Otherwise the live translator is used when one is supplied; without one,
/// rule text stays as is.
pub fn translate_rules(
    rules: &[CompiledRule],
    request: &TranslationRequest,
    bundled: &BundledTranslations,
    translator: Option<&dyn Translator>,
) -> TranslationOutcome {
    let language = request.language.as_str();
    let mut diagnostics = Vec::new();

    let supported = is_supported_language(language);
    if !supported {
        warn!(
            "Language '{}' is not in the supported language list",
            language
        );
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnsupportedLanguage,
            format!("'{language}' is not a supported language code"),
        ));
    }

    if supported && !request.skip_bundled {
        let overlay = bundled_overlay(rules, bundled, language);
        debug!("Applied {} bundled translation(s) for '{}'", overlay.len(), language);
        return TranslationOutcome {
            rules: apply_overlay(rules, &overlay),
            diagnostics,
            strategy: TranslationStrategy::Bundled,
        };
    }

    let Some(translator) = translator else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::TranslationUnavailable,
            format!("no live translator configured; rule text for '{language}' left untranslated"),
        ));
        return TranslationOutcome {
            rules: rules.to_vec(),
            diagnostics,
            strategy: TranslationStrategy::Untranslated,
        };
    };

    let (overlay, live_diagnostics) = live_overlay(rules, translator, language, request.concurrency);
    diagnostics.extend(live_diagnostics);
    TranslationOutcome {
        rules: apply_overlay(rules, &overlay),
        diagnostics,
        strategy: TranslationStrategy::Live,
    }
}
