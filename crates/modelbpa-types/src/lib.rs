//! Data types (config + reports) for modelbpa.
//!
//! This crate is intentionally "dumb": pure DTOs with serde + schemars.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod builtin;

// ── Schema Identifiers ─────────────────────────────────────────
pub const REPORT_SCHEMA_V1: &str = "modelbpa.report.v1";
pub const EXPORT_SCHEMA_V1: &str = "modelbpa.export.v1";

/// Object name recorded for violations of Model-scope rules.
pub const MODEL_OBJECT_NAME: &str = "Model";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[serde(alias = "Info")]
    Info,
    #[serde(alias = "Warning", alias = "warn")]
    Warning,
    #[serde(alias = "Error")]
    Error,
}

impl Severity {
    /// Display order used in summaries: most severe first.
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Human label, also the persisted form.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }

    /// Display glyph. The mapping is bijective, see [`Severity::from_symbol`].
    pub fn symbol(self) -> &'static str {
        match self {
            Severity::Info => "\u{2139}\u{fe0f}",
            Severity::Warning => "\u{26a0}\u{fe0f}",
            Severity::Error => "\u{274c}",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Severity> {
        Severity::ALL.into_iter().find(|s| s.symbol() == symbol)
    }

    pub fn from_label(label: &str) -> Option<Severity> {
        Severity::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The kind of model object a rule applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ScopeName {
    #[serde(alias = "model")]
    Model,
    #[serde(alias = "table")]
    Table,
    #[serde(alias = "column")]
    Column,
    #[serde(alias = "measure")]
    Measure,
    #[serde(alias = "hierarchy")]
    Hierarchy,
    #[serde(alias = "relationship")]
    Relationship,
    #[serde(alias = "role")]
    Role,
    #[serde(alias = "partition")]
    Partition,
    #[serde(
        rename = "Row Level Security",
        alias = "RowLevelSecurity",
        alias = "row_level_security"
    )]
    RowLevelSecurity,
    #[serde(
        rename = "Calculation Item",
        alias = "CalculationItem",
        alias = "calculation_item"
    )]
    CalculationItem,
}

impl ScopeName {
    pub const ALL: [ScopeName; 10] = [
        ScopeName::Model,
        ScopeName::Table,
        ScopeName::Column,
        ScopeName::Measure,
        ScopeName::Hierarchy,
        ScopeName::Relationship,
        ScopeName::Role,
        ScopeName::Partition,
        ScopeName::RowLevelSecurity,
        ScopeName::CalculationItem,
    ];

    /// Display name, also used as the "Object Type" column of reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeName::Model => "Model",
            ScopeName::Table => "Table",
            ScopeName::Column => "Column",
            ScopeName::Measure => "Measure",
            ScopeName::Hierarchy => "Hierarchy",
            ScopeName::Relationship => "Relationship",
            ScopeName::Role => "Role",
            ScopeName::Partition => "Partition",
            ScopeName::RowLevelSecurity => "Row Level Security",
            ScopeName::CalculationItem => "Calculation Item",
        }
    }

    /// Stable position in [`ScopeName::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ScopeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScopeName(pub String);

impl fmt::Display for UnknownScopeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scope '{}'", self.0)
    }
}

impl std::error::Error for UnknownScopeName {}

impl FromStr for ScopeName {
    type Err = UnknownScopeName;

    /// Accepts the display name ("Row Level Security"), the PascalCase name
    /// ("RowLevelSecurity") and the snake_case name ("row_level_security").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ScopeName::ALL
            .into_iter()
            .find(|scope| {
                let candidate: String = scope
                    .as_str()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                candidate == folded
            })
            .ok_or_else(|| UnknownScopeName(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailOn {
    Error,
    #[serde(alias = "warn")]
    Warning,
    Never,
}

impl FailOn {
    pub fn as_str(self) -> &'static str {
        match self {
            FailOn::Error => "error",
            FailOn::Warning => "warning",
            FailOn::Never => "never",
        }
    }
}

/// A scalar property value exposed by a model object, or a literal in a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

/// Declarative rule predicate, compiled by `modelbpa-domain` into an evaluator.
///
/// Property names are checked against every scope the rule targets when the
/// catalog is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// True when every nested condition holds (true for an empty list).
    All { of: Vec<Condition> },
    /// True when any nested condition holds (false for an empty list).
    Any { of: Vec<Condition> },
    Not { condition: Box<Condition> },
    Eq {
        property: String,
        value: PropertyValue,
    },
    Ne {
        property: String,
        value: PropertyValue,
    },
    /// Numeric comparison; the property must be int or float.
    Gt { property: String, value: f64 },
    Lt { property: String, value: f64 },
    /// Regex search over a text property.
    Matches { property: String, pattern: String },
    Contains {
        property: String,
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// True for a missing value or an empty/whitespace-only text.
    IsEmpty { property: String },
    Always,
}

/// The on-disk configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigFile {
    /// Include other config files. Paths are relative to this config file's directory.
    /// Rules are merged: later definitions override earlier ones by rule name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub rule: Vec<RuleConfig>,
}

impl ConfigFile {
    pub fn empty() -> Self {
        Self {
            includes: vec![],
            defaults: Defaults::default(),
            rule: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Defaults {
    /// Target language code for rule text (e.g. "it-IT").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Always use the live translator, even for bundled languages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_bundled_translations: Option<bool>,
    /// Worker limit for rule evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Worker limit for live translation calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<FailOn>,
    /// Workspace identifier recorded in exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            language: None,
            skip_bundled_translations: Some(false),
            concurrency: Some(1),
            translation_concurrency: Some(5),
            fail_on: Some(FailOn::Error),
            workspace: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleConfig {
    /// Unique rule name; violations are joined back to rules by this name.
    pub name: String,
    pub category: String,
    pub severity: Severity,
    /// Object scopes the rule is evaluated against. Must not be empty.
    pub scopes: Vec<ScopeName>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub condition: Condition,
}

/// Rule metadata joined onto violations. Everything but the predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleMeta {
    pub name: String,
    pub category: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&RuleConfig> for RuleMeta {
    fn from(cfg: &RuleConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            category: cfg.category.clone(),
            severity: cfg.severity,
            description: cfg.description.clone(),
            url: cfg.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    pub object_name: String,
    pub scope: ScopeName,
    pub rule_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportRow {
    pub category: String,
    pub rule_name: String,
    pub severity: Severity,
    pub object_type: ScopeName,
    pub object_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SeverityCounts {
    pub info: u32,
    pub warning: u32,
    pub error: u32,
}

impl SeverityCounts {
    pub fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Info => self.info = self.info.saturating_add(1),
            Severity::Warning => self.warning = self.warning.saturating_add(1),
            Severity::Error => self.error = self.error.saturating_add(1),
        }
    }

    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
        }
    }

    pub fn total(&self) -> u32 {
        self.info
            .saturating_add(self.warning)
            .saturating_add(self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryGroup {
    pub category: String,
    pub rows: Vec<ReportRow>,
    pub severity_counts: SeverityCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A predicate failed on malformed model data; that (rule, scope) was skipped.
    PredicateError,
    /// A violation referenced a rule name missing from the catalog; the row was dropped.
    JoinConsistency,
    /// Two or more rules share a name; the first one was used for the join.
    DuplicateRule,
    /// Translation failed or was partial; original text was kept.
    TranslationUnavailable,
    /// The requested language is outside the bundled set.
    UnsupportedLanguage,
    /// Two rules received the same translated name; rows keep their own rule's metadata.
    TranslationCollision,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::PredicateError => "predicate_error",
            DiagnosticKind::JoinConsistency => "join_consistency",
            DiagnosticKind::DuplicateRule => "duplicate_rule",
            DiagnosticKind::TranslationUnavailable => "translation_unavailable",
            DiagnosticKind::UnsupportedLanguage => "unsupported_language",
            DiagnosticKind::TranslationCollision => "translation_collision",
        }
    }
}

/// A recovered, out-of-band problem reported alongside the primary result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeName>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule_name: None,
            scope: None,
            message: message.into(),
        }
    }

    pub fn with_rule(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    pub fn with_scope(mut self, scope: ScopeName) -> Self {
        self.scope = Some(scope);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelMeta {
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub objects_scanned: u32,
}

/// The flat, caller-facing result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub schema: String,
    pub tool: ToolMeta,
    pub model: ModelMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub rules_evaluated: u32,
    pub status: VerdictStatus,
    pub counts: SeverityCounts,
    pub rows: Vec<ReportRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// One persisted row. Column names match the historical results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExportRecord {
    #[serde(rename = "Workspace_Name")]
    pub workspace_name: String,
    #[serde(rename = "Dataset_Name")]
    pub dataset_name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Rule_Name")]
    pub rule_name: String,
    /// Severity label ("Info" | "Warning" | "Error"), never the glyph.
    #[serde(rename = "Severity")]
    pub severity: String,
    #[serde(rename = "Object_Type")]
    pub object_type: String,
    #[serde(rename = "Object_Name")]
    pub object_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// RFC 3339 timestamp of the run.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "RunId")]
    pub run_id: u64,
}

impl ExportRecord {
    /// Placeholder persisted for a run with no violations, so the run id is
    /// still consumed and the run shows up in history. Every rule and object
    /// column is empty.
    pub fn run_marker(
        workspace_name: impl Into<String>,
        dataset_name: impl Into<String>,
        timestamp: impl Into<String>,
        run_id: u64,
    ) -> Self {
        Self {
            workspace_name: workspace_name.into(),
            dataset_name: dataset_name.into(),
            category: String::new(),
            rule_name: String::new(),
            severity: String::new(),
            object_type: String::new(),
            object_name: String::new(),
            description: String::new(),
            url: None,
            timestamp: timestamp.into(),
            run_id,
        }
    }

    pub fn is_run_marker(&self) -> bool {
        self.rule_name.is_empty() && self.object_name.is_empty() && self.severity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_symbols_round_trip() {
        for sev in Severity::ALL {
            assert_eq!(Severity::from_symbol(sev.symbol()), Some(sev));
            assert_eq!(Severity::from_label(sev.label()), Some(sev));
        }
        assert_eq!(Severity::from_symbol("?"), None);
    }

    #[test]
    fn scope_name_parses_display_pascal_and_snake() {
        assert_eq!(
            "Row Level Security".parse::<ScopeName>(),
            Ok(ScopeName::RowLevelSecurity)
        );
        assert_eq!(
            "CalculationItem".parse::<ScopeName>(),
            Ok(ScopeName::CalculationItem)
        );
        assert_eq!(
            "calculation_item".parse::<ScopeName>(),
            Ok(ScopeName::CalculationItem)
        );
        assert_eq!("table".parse::<ScopeName>(), Ok(ScopeName::Table));
        assert!("Perspective".parse::<ScopeName>().is_err());
    }

    #[test]
    fn scope_index_matches_all_order() {
        for (i, scope) in ScopeName::ALL.into_iter().enumerate() {
            assert_eq!(scope.index(), i);
        }
    }

    #[test]
    fn counts_bump_and_total() {
        let mut c = SeverityCounts::default();
        c.bump(Severity::Error);
        c.bump(Severity::Error);
        c.bump(Severity::Info);
        assert_eq!(c.get(Severity::Error), 2);
        assert_eq!(c.get(Severity::Warning), 0);
        assert_eq!(c.total(), 3);
    }
}
