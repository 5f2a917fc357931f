use tracing::{debug, info};

use modelbpa_domain::{
    BundledTranslations, EvaluateError, RuleCompileError, ScopeRegistry, TranslationRequest,
    TranslationStrategy, Translator, compile_rules, evaluate_parallel, translate_rules,
};
use modelbpa_model::SemanticModel;
use modelbpa_types::{
    AnalysisReport, CategoryGroup, ConfigFile, FailOn, ModelMeta, REPORT_SCHEMA_V1, RuleConfig,
    RuleMeta, SeverityCounts, ToolMeta, VerdictStatus,
};

use crate::assemble::{assemble, localize};
use crate::document::{ReportDocument, build_document};
use crate::html::render_html;
use crate::render::render_markdown_for_report;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPlan {
    /// Dataset name recorded in the report; the model name when unset.
    pub dataset: Option<String>,
    pub workspace: Option<String>,
    /// Target language for rule text. `None` or empty keeps the catalog text.
    pub language: Option<String>,
    pub skip_bundled_translations: bool,
    pub concurrency: usize,
    pub translation_concurrency: usize,
    pub fail_on: FailOn,
    /// Only evaluate rules in these categories (case-insensitive).
    /// Empty means no filtering by this criterion.
    pub include_categories: Vec<String>,
    /// Skip rules in these categories (case-insensitive).
    pub exclude_categories: Vec<String>,
}

impl Default for AnalysisPlan {
    fn default() -> Self {
        Self {
            dataset: None,
            workspace: None,
            language: None,
            skip_bundled_translations: false,
            concurrency: 1,
            translation_concurrency: modelbpa_domain::DEFAULT_TRANSLATION_CONCURRENCY,
            fail_on: FailOn::Error,
            include_categories: vec![],
            exclude_categories: vec![],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Compile(#[from] RuleCompileError),

    #[error(transparent)]
    Evaluate(#[from] EvaluateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRun {
    pub report: AnalysisReport,
    pub groups: Vec<CategoryGroup>,
    pub document: ReportDocument,
    pub html: String,
    pub markdown: String,
    pub exit_code: i32,
    /// `None` when no language was requested.
    pub translation: Option<TranslationStrategy>,
}

/// Evaluate `config`'s rules against `model` and build every report form.
///
/// Rule text is translated on a copy of the catalog. Evaluation and the
/// violation join use the untranslated catalog; report rows then carry the
/// translated category, name and description of the rule that matched.
pub fn run_analysis(
    plan: &AnalysisPlan,
    config: &ConfigFile,
    model: &SemanticModel,
    bundled: &BundledTranslations,
    translator: Option<&dyn Translator>,
) -> Result<AnalysisRun, AnalysisError> {
    let filtered: Vec<RuleConfig> = config
        .rule
        .iter()
        .filter(|r| filter_rule_by_category(r, plan))
        .cloned()
        .collect();
    debug!(
        "{} of {} rule(s) selected after category filters",
        filtered.len(),
        config.rule.len()
    );

    let rules = compile_rules(&filtered)?;
    let mut diagnostics = Vec::new();

    let language = plan.language.as_deref().filter(|l| !l.trim().is_empty());
    let mut translation = None;
    let mut translated = None;
    if let Some(language) = language {
        let request = TranslationRequest {
            language: language.to_string(),
            skip_bundled: plan.skip_bundled_translations,
            concurrency: plan.translation_concurrency,
        };
        let outcome = translate_rules(&rules, &request, bundled, translator);
        info!("Rule text for '{}' resolved via {:?}", language, outcome.strategy);
        diagnostics.extend(outcome.diagnostics);
        translation = Some(outcome.strategy);
        translated = Some(outcome.rules);
    }

    let registry = ScopeRegistry::for_model(model);
    let evaluation = evaluate_parallel(&rules, &registry, plan.concurrency)?;
    info!(
        "Evaluated {} rule(s): {} violation(s), {} failed unit(s)",
        evaluation.rules_evaluated,
        evaluation.violations.len(),
        evaluation.units_failed
    );
    diagnostics.extend(evaluation.diagnostics);

    // Violations join on the catalog's own names; translated text is display only.
    let metas: Vec<RuleMeta> = rules.iter().map(|r| r.meta.clone()).collect();
    let mut assembly = assemble(&evaluation.violations, &metas);
    if let Some(translated) = &translated {
        let localized: Vec<RuleMeta> = translated.iter().map(|r| r.meta.clone()).collect();
        assembly = localize(assembly, &metas, &localized);
    }
    diagnostics.extend(std::mem::take(&mut assembly.diagnostics));

    let status = verdict_status(&assembly.counts);
    let exit_code = compute_exit_code(plan.fail_on, &assembly.counts);

    let report = AnalysisReport {
        schema: REPORT_SCHEMA_V1.to_string(),
        tool: ToolMeta {
            name: "modelbpa".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        model: ModelMeta {
            dataset: plan.dataset.clone().unwrap_or_else(|| model.name.clone()),
            workspace: plan.workspace.clone(),
            objects_scanned: model.object_count().min(u32::MAX as usize) as u32,
        },
        language: language.map(str::to_string),
        rules_evaluated: evaluation.rules_evaluated,
        status,
        counts: assembly.counts,
        rows: assembly.rows,
        diagnostics,
    };

    let document = build_document(&assembly.groups);
    let html = render_html(&document);
    let markdown = render_markdown_for_report(&report, &assembly.groups);

    Ok(AnalysisRun {
        report,
        groups: assembly.groups,
        document,
        html,
        markdown,
        exit_code,
        translation,
    })
}

/// - If `include_categories` is non-empty, the rule's category must match one.
/// - A rule whose category matches `exclude_categories` is always dropped.
fn filter_rule_by_category(rule: &RuleConfig, plan: &AnalysisPlan) -> bool {
    if !plan.include_categories.is_empty()
        && !plan
            .include_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&rule.category))
    {
        return false;
    }
    !plan
        .exclude_categories
        .iter()
        .any(|c| c.eq_ignore_ascii_case(&rule.category))
}

fn verdict_status(counts: &SeverityCounts) -> VerdictStatus {
    if counts.error > 0 {
        VerdictStatus::Fail
    } else if counts.warning > 0 {
        VerdictStatus::Warn
    } else {
        VerdictStatus::Pass
    }
}

fn compute_exit_code(fail_on: FailOn, counts: &SeverityCounts) -> i32 {
    if matches!(fail_on, FailOn::Never) {
        return 0;
    }

    if counts.error > 0 {
        return 2;
    }

    if matches!(fail_on, FailOn::Warning) && counts.warning > 0 {
        return 3;
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelbpa_testkit::fixtures::{self, sample_configs};
    use modelbpa_types::{DiagnosticKind, ScopeName, Severity};

    fn run(plan: &AnalysisPlan, config: &ConfigFile) -> AnalysisRun {
        let bundled = BundledTranslations::built_in().unwrap();
        run_analysis(plan, config, &fixtures::sample_model(), &bundled, None).unwrap()
    }

    #[test]
    fn built_in_catalog_on_sample_model() {
        let out = run(&AnalysisPlan::default(), &sample_configs::built_in());
        assert_eq!(out.report.rows.len(), 11);
        assert_eq!(out.report.counts.error, 1);
        assert_eq!(out.report.counts.warning, 5);
        assert_eq!(out.report.counts.info, 5);
        assert_eq!(out.report.status, VerdictStatus::Fail);
        assert_eq!(out.exit_code, 2);
        assert_eq!(out.report.model.dataset, "Sample");
        assert!(out.report.diagnostics.is_empty());

        let categories: Vec<_> = out.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(
            categories,
            vec!["DAX Expressions", "Formatting", "Maintenance", "Performance"]
        );
        assert_eq!(out.document.tabs.len(), 4);
        assert!(out.html.contains("DAX Expressions (1 × Error + 2 × Warning)"));
        assert!(out.markdown.contains("### Maintenance (4 × Info)"));
    }

    #[test]
    fn minimal_rule_flags_float_column() {
        let out = run(&AnalysisPlan::default(), &sample_configs::minimal());
        assert_eq!(out.report.rows.len(), 1);
        let row = &out.report.rows[0];
        assert_eq!(row.rule_name, "AvoidFloatColumn");
        assert_eq!(row.object_type, ScopeName::Column);
        assert_eq!(row.object_name, "Table1[A]");
        assert_eq!(out.report.status, VerdictStatus::Warn);
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn fail_on_policies() {
        let config = sample_configs::minimal();
        let warn = AnalysisPlan {
            fail_on: FailOn::Warning,
            ..AnalysisPlan::default()
        };
        assert_eq!(run(&warn, &config).exit_code, 3);

        let never = AnalysisPlan {
            fail_on: FailOn::Never,
            ..AnalysisPlan::default()
        };
        assert_eq!(run(&never, &sample_configs::built_in()).exit_code, 0);
    }

    #[test]
    fn category_filters_are_case_insensitive() {
        let include = AnalysisPlan {
            include_categories: vec!["performance".to_string()],
            ..AnalysisPlan::default()
        };
        let out = run(&include, &sample_configs::built_in());
        assert!(out.report.rows.iter().all(|r| r.category == "Performance"));
        assert_eq!(out.report.rows.len(), 2);

        let exclude = AnalysisPlan {
            exclude_categories: vec!["MAINTENANCE".to_string()],
            ..AnalysisPlan::default()
        };
        let out = run(&exclude, &sample_configs::built_in());
        assert!(out.report.rows.iter().all(|r| r.category != "Maintenance"));
        assert_eq!(out.report.rows.len(), 7);
    }

    #[test]
    fn bundled_translation_renames_rows_but_keeps_severity() {
        let plan = AnalysisPlan {
            language: Some("it-IT".to_string()),
            ..AnalysisPlan::default()
        };
        let base = run(&AnalysisPlan::default(), &sample_configs::built_in());
        let out = run(&plan, &sample_configs::built_in());
        assert_eq!(out.translation, Some(TranslationStrategy::Bundled));
        assert_eq!(out.report.language.as_deref(), Some("it-IT"));
        assert_eq!(out.report.rows.len(), base.report.rows.len());
        assert_eq!(out.report.counts, base.report.counts);
        assert!(
            out.report
                .rows
                .iter()
                .all(|r| !base.report.rows.iter().any(|b| b.rule_name == r.rule_name))
        );
    }

    #[test]
    fn unsupported_language_keeps_original_text() {
        let plan = AnalysisPlan {
            language: Some("xx-XX".to_string()),
            ..AnalysisPlan::default()
        };
        let out = run(&plan, &sample_configs::minimal());
        assert_eq!(out.translation, Some(TranslationStrategy::Untranslated));
        assert_eq!(out.report.rows[0].rule_name, "AvoidFloatColumn");
        assert!(
            out.report
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::UnsupportedLanguage)
        );
    }

    struct Constant(&'static str);

    impl Translator for Constant {
        fn translate_batch(
            &self,
            texts: &[String],
            _target_language: &str,
        ) -> Result<Vec<Option<String>>, modelbpa_domain::TranslationError> {
            Ok(texts.iter().map(|_| Some(self.0.to_string())).collect())
        }
    }

    #[test]
    fn colliding_live_translations_keep_rule_metadata() {
        let plan = AnalysisPlan {
            language: Some("xx-XX".to_string()),
            ..AnalysisPlan::default()
        };
        let bundled = BundledTranslations::built_in().unwrap();
        let model = fixtures::sample_model();
        let translator = Constant("Regel");

        let base = run(&AnalysisPlan::default(), &sample_configs::built_in());
        let out = run_analysis(
            &plan,
            &sample_configs::built_in(),
            &model,
            &bundled,
            Some(&translator as &dyn Translator),
        )
        .unwrap();

        assert_eq!(out.translation, Some(TranslationStrategy::Live));
        assert_eq!(out.report.counts, base.report.counts);
        assert_eq!(out.exit_code, base.exit_code);
        assert!(out.report.rows.iter().all(|r| r.rule_name == "Regel"));
        assert!(
            out.report
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::TranslationCollision)
        );
    }

    #[test]
    fn duplicate_rule_names_attribute_to_first() {
        let mut config = sample_configs::minimal();
        let mut second = config.rule[0].clone();
        second.category = "Shadowed".to_string();
        second.severity = Severity::Error;
        config.rule.push(second);

        let out = run(&AnalysisPlan::default(), &config);
        assert!(out.report.rows.iter().all(|r| r.category == "Performance"));
        assert!(
            out.report
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::DuplicateRule)
        );
    }

    #[test]
    fn empty_catalog_passes() {
        let out = run(&AnalysisPlan::default(), &sample_configs::empty());
        assert_eq!(out.report.status, VerdictStatus::Pass);
        assert!(out.document.is_empty());
        assert_eq!(out.exit_code, 0);
    }
}
