use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use modelbpa_core::{
    AnalysisPlan, ExportContext, ResultStore, export_rows, render_csv, render_tsv, run_analysis,
    summarize_history,
};
use modelbpa_domain::{BundledTranslations, Translator, compile_rules, is_supported_language};
use modelbpa_model::load_model;
use modelbpa_types::{Condition, ConfigFile, FailOn, RuleConfig};

mod config_loader;
mod env_expand;
mod store;
mod translator;

use config_loader::{load_config_with_includes, merge_rules};
use store::JsonlStore;
use translator::CommandTranslator;

const DEFAULT_CONFIG: &str = "modelbpa.toml";

#[derive(Parser)]
#[command(name = "modelbpa")]
#[command(about = "Best-practice analyzer for tabular semantic models", long_about = None)]
struct Cli {
    /// Enable verbose (info-level) logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Enable debug-level logging to stderr.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the rule catalog against a model snapshot.
    Analyze(Box<AnalyzeArgs>),

    /// Print the effective rules (built-in + optional config merge).
    Rules(RulesArgs),

    /// Show detailed information about a specific rule.
    Explain(ExplainArgs),

    /// Validate the configuration file (scopes, properties, regex patterns).
    Validate(ValidateArgs),

    /// Summarize runs previously exported to a result store.
    History(HistoryArgs),
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Path to a config file. If omitted, uses ./modelbpa.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable built-in rules; only use the config file.
    #[arg(long)]
    no_default_rules: bool,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Model snapshot (JSON, bare or `.bim`-style).
    model: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Translate rule text into this language (e.g. it-IT).
    #[arg(long)]
    language: Option<String>,

    /// Use the live translator even for languages with bundled translations.
    #[arg(long)]
    skip_bundled_translations: bool,

    /// Extra bundled translation table (TOML) merged over the built-in one.
    #[arg(long)]
    translations: Option<PathBuf>,

    /// External live-translation program (JSON array on stdin and stdout).
    #[arg(long)]
    translator_cmd: Option<String>,

    /// Argument passed to the translator program (repeatable).
    #[arg(long = "translator-arg", requires = "translator_cmd", allow_hyphen_values = true)]
    translator_args: Vec<String>,

    /// Worker limit for rule evaluation.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Worker limit for live translation calls.
    #[arg(long)]
    translation_concurrency: Option<usize>,

    /// Dataset name recorded in reports and exports (defaults to the model name).
    #[arg(long)]
    dataset: Option<String>,

    /// Workspace name recorded in reports and exports.
    #[arg(long)]
    workspace: Option<String>,

    /// Only evaluate rules in this category (repeatable, case-insensitive).
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Skip rules in this category (repeatable, case-insensitive).
    #[arg(long = "exclude-category")]
    exclude_categories: Vec<String>,

    #[arg(long, value_enum)]
    fail_on: Option<FailOnArg>,

    /// Write the JSON report here.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the tabbed HTML report here.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Write the Markdown report here (printed to stdout when omitted).
    #[arg(long)]
    md: Option<PathBuf>,

    /// Write the flat report table as CSV here.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the flat report table as TSV here.
    #[arg(long)]
    tsv: Option<PathBuf>,

    /// Append the results to this JSON-lines result store.
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RulesArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long, value_enum, default_value_t = RulesFormat::Toml)]
    format: RulesFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RulesFormat {
    Toml,
    Json,
}

#[derive(Parser, Debug)]
struct ExplainArgs {
    /// The rule name to explain.
    rule_name: String,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Path to the config file to validate (defaults to ./modelbpa.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct HistoryArgs {
    /// JSON-lines result store written by `analyze --export`.
    store: PathBuf,

    /// Only include runs for this dataset.
    #[arg(long)]
    dataset: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FailOnArg {
    Error,
    Warning,
    Never,
}

impl From<FailOnArg> for FailOn {
    fn from(v: FailOnArg) -> Self {
        match v {
            FailOnArg::Error => FailOn::Error,
            FailOnArg::Warning => FailOn::Warning,
            FailOnArg::Never => FailOn::Never,
        }
    }
}

fn main() -> std::process::ExitCode {
    match run_with_args(std::env::args_os()) {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:?}");
            std::process::ExitCode::from(1)
        }
    }
}

fn run_with_args<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Analyze(args) => cmd_analyze(*args),
        Commands::Rules(args) => {
            cmd_rules(args)?;
            Ok(0)
        }
        Commands::Explain(args) => {
            cmd_explain(args)?;
            Ok(0)
        }
        Commands::Validate(args) => cmd_validate(args),
        Commands::History(args) => {
            cmd_history(args)?;
            Ok(0)
        }
    }
}

/// Initialize tracing/logging based on CLI flags.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<i32> {
    let cfg = load_config(args.config.config.clone(), args.config.no_default_rules)?;
    let plan = resolve_plan(&args, &cfg);

    let model_text = std::fs::read_to_string(&args.model)
        .with_context(|| format!("read model {}", args.model.display()))?;
    let model =
        load_model(&model_text).with_context(|| format!("load model {}", args.model.display()))?;
    info!(
        "Loaded model '{}' with {} object(s)",
        model.name,
        model.object_count()
    );

    let bundled = load_bundled_translations(args.translations.as_deref())?;
    let live = args
        .translator_cmd
        .as_ref()
        .map(|cmd| CommandTranslator::new(cmd.clone(), args.translator_args.clone()));
    let translator = live.as_ref().map(|t| t as &dyn Translator);

    let run = run_analysis(&plan, &cfg, &model, &bundled, translator)?;

    for d in &run.report.diagnostics {
        match &d.rule_name {
            Some(rule) => warn!("{}: {} (rule '{}')", d.kind.as_str(), d.message, rule),
            None => warn!("{}: {}", d.kind.as_str(), d.message),
        }
    }

    if let Some(path) = &args.out {
        let json = serde_json::to_string_pretty(&run.report).context("serialize report")?;
        write_text(path, &json)?;
    }
    if let Some(path) = &args.html {
        write_text(path, &run.html)?;
    }
    if let Some(path) = &args.csv {
        write_text(path, &render_csv(&run.report.rows))?;
    }
    if let Some(path) = &args.tsv {
        write_text(path, &render_tsv(&run.report.rows))?;
    }
    match &args.md {
        Some(path) => write_text(path, &run.markdown)?,
        None => print!("{}", run.markdown),
    }

    if let Some(path) = &args.export {
        let ctx = ExportContext {
            workspace: run.report.model.workspace.clone().unwrap_or_default(),
            dataset: run.report.model.dataset.clone(),
            timestamp: Utc::now(),
        };
        let mut store = JsonlStore::new(path);
        let summary = export_rows(
            &run.report.rows,
            &ctx,
            Some(&mut store as &mut dyn ResultStore),
        )
        .with_context(|| format!("export to {}", store.path().display()))?;
        info!(
            "Run {} appended to {} ({} row(s))",
            summary.run_id,
            path.display(),
            summary.records_written
        );
    }

    Ok(run.exit_code)
}

/// CLI flags override config defaults.
fn resolve_plan(args: &AnalyzeArgs, cfg: &ConfigFile) -> AnalysisPlan {
    let defaults = &cfg.defaults;
    let base = AnalysisPlan::default();
    AnalysisPlan {
        dataset: args.dataset.clone(),
        workspace: args.workspace.clone().or_else(|| defaults.workspace.clone()),
        language: args.language.clone().or_else(|| defaults.language.clone()),
        skip_bundled_translations: args.skip_bundled_translations
            || defaults.skip_bundled_translations.unwrap_or(false),
        concurrency: args
            .concurrency
            .or(defaults.concurrency)
            .unwrap_or(base.concurrency)
            .max(1),
        translation_concurrency: args
            .translation_concurrency
            .or(defaults.translation_concurrency)
            .unwrap_or(base.translation_concurrency)
            .max(1),
        fail_on: args
            .fail_on
            .map(FailOn::from)
            .or(defaults.fail_on)
            .unwrap_or(base.fail_on),
        include_categories: args.categories.clone(),
        exclude_categories: args.exclude_categories.clone(),
    }
}

fn load_bundled_translations(extra: Option<&Path>) -> Result<BundledTranslations> {
    let mut bundled = BundledTranslations::built_in().context("load built-in translations")?;
    if let Some(path) = extra {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read translations {}", path.display()))?;
        let table = BundledTranslations::from_toml(&text)
            .with_context(|| format!("parse translations {}", path.display()))?;
        debug!("Merging {} extra translation(s)", table.len());
        bundled.merge(table);
    }
    Ok(bundled)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn cmd_rules(args: RulesArgs) -> Result<()> {
    let cfg = load_config(args.config.config, args.config.no_default_rules)?;

    match args.format {
        RulesFormat::Toml => {
            let s = toml::to_string_pretty(&cfg).context("render toml")?;
            print!("{s}");
        }
        RulesFormat::Json => {
            let s = serde_json::to_string_pretty(&cfg).context("render json")?;
            print!("{s}");
        }
    }

    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<i32> {
    info!("Validating configuration file");

    let config_path = args.config.clone().or_else(|| {
        let p = PathBuf::from(DEFAULT_CONFIG);
        if p.exists() { Some(p) } else { None }
    });
    let Some(path) = config_path else {
        bail!("No configuration file found. Specify --config or create {DEFAULT_CONFIG}");
    };

    let cfg = load_config_with_includes(&path, expand_env_vars)?;

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    for rule in &cfg.rule {
        if !seen.insert(&rule.name) {
            errors.push(format!("Rule '{}': duplicate rule name", rule.name));
        }
    }

    for rule in &cfg.rule {
        debug!("Validating rule: {}", rule.name);
        if rule.scopes.is_empty() {
            errors.push(format!("Rule '{}': no scopes defined", rule.name));
            continue;
        }
        // Compile one rule at a time so every broken rule is reported.
        if let Err(e) = compile_rules(std::slice::from_ref(rule)) {
            errors.push(format!("Rule '{}': {}", rule.name, e));
        }
        if rule.description.trim().is_empty() {
            warnings.push(format!("Rule '{}': empty description", rule.name));
        }
    }

    if let Some(language) = &cfg.defaults.language
        && !is_supported_language(language)
    {
        warnings.push(format!(
            "defaults.language '{language}' has no bundled translations; a live translator is required"
        ));
    }

    match args.format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "valid": errors.is_empty(),
                "path": path.display().to_string(),
                "rules_count": cfg.rule.len(),
                "errors": errors,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("Validating {}...", path.display());
            println!();

            if !warnings.is_empty() {
                println!("Warnings ({}):", warnings.len());
                for (i, w) in warnings.iter().enumerate() {
                    println!("  {}. {}", i + 1, w);
                }
                println!();
            }

            if errors.is_empty() {
                println!("Configuration is valid!");
                println!("  {} rule(s) defined", cfg.rule.len());
            } else {
                println!("Configuration has {} error(s):", errors.len());
                println!();
                for (i, err) in errors.iter().enumerate() {
                    println!("  {}. {}", i + 1, err);
                }
            }
        }
    }

    if errors.is_empty() { Ok(0) } else { Ok(1) }
}

fn cmd_explain(args: ExplainArgs) -> Result<()> {
    let cfg = load_config(args.config.config, args.config.no_default_rules)?;

    if let Some(r) = cfg.rule.iter().find(|r| r.name == args.rule_name) {
        print!("{}", format_rule_explanation(r));
        return Ok(());
    }

    let suggestions = find_similar_rules(&args.rule_name, &cfg.rule);
    let mut msg = format!("Rule '{}' not found.", args.rule_name);
    if !suggestions.is_empty() {
        msg.push_str("\n\nDid you mean one of these?\n");
        for s in &suggestions {
            msg.push_str(&format!("  - {}\n", s));
        }
    }
    msg.push_str("\nUse 'modelbpa rules' to list all available rules.");
    bail!("{}", msg);
}

fn format_rule_explanation(rule: &RuleConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("Rule: {}\n", rule.name));
    out.push_str(&format!("Category: {}\n", rule.category));
    out.push_str(&format!(
        "Severity: {} {}\n",
        rule.severity.symbol(),
        rule.severity.label()
    ));

    out.push_str("\nApplies to:\n");
    for scope in &rule.scopes {
        out.push_str(&format!("  - {}\n", scope.as_str()));
    }

    out.push_str("\nCondition:\n");
    out.push_str(&format!("  {}\n", format_condition(&rule.condition)));

    if !rule.description.is_empty() {
        out.push_str("\nDescription:\n");
        for line in rule.description.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }

    if let Some(url) = &rule.url {
        out.push_str(&format!("\nSee also: {}\n", url));
    }

    out
}

fn format_condition(c: &Condition) -> String {
    let join = |of: &[Condition], sep: &str| {
        let parts: Vec<_> = of.iter().map(format_condition).collect();
        format!("({})", parts.join(sep))
    };
    match c {
        Condition::All { of } if of.is_empty() => "always".to_string(),
        Condition::All { of } => join(of, " and "),
        Condition::Any { of } if of.is_empty() => "never".to_string(),
        Condition::Any { of } => join(of, " or "),
        Condition::Not { condition } => format!("not {}", format_condition(condition)),
        Condition::Eq { property, value } => format!("{property} == {value}"),
        Condition::Ne { property, value } => format!("{property} != {value}"),
        Condition::Gt { property, value } => format!("{property} > {value}"),
        Condition::Lt { property, value } => format!("{property} < {value}"),
        Condition::Matches { property, pattern } => format!("{property} matches /{pattern}/"),
        Condition::Contains {
            property,
            value,
            case_sensitive,
        } => format!(
            "{property} contains \"{value}\"{}",
            if *case_sensitive { "" } else { " (ignoring case)" }
        ),
        Condition::IsEmpty { property } => format!("{property} is empty"),
        Condition::Always => "always".to_string(),
    }
}

/// Find rules with names similar to `name`.
fn find_similar_rules(name: &str, rules: &[RuleConfig]) -> Vec<String> {
    let needle = name.to_lowercase();
    let mut candidates: Vec<(String, usize)> = Vec::new();

    for r in rules {
        let candidate = r.name.to_lowercase();

        if candidate.starts_with(&needle) || needle.starts_with(&candidate) {
            candidates.push((r.name.clone(), 0));
            continue;
        }
        if candidate.contains(&needle) || needle.contains(&candidate) {
            candidates.push((r.name.clone(), 1));
            continue;
        }
        let distance = simple_edit_distance(&needle, &candidate);
        if distance <= 3 {
            candidates.push((r.name.clone(), distance + 2));
        }
    }

    candidates.sort_by_key(|(_, score)| *score);
    candidates.truncate(5);
    candidates.into_iter().map(|(n, _)| n).collect()
}

fn simple_edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

fn cmd_history(args: HistoryArgs) -> Result<()> {
    let store = JsonlStore::new(&args.store);
    let records = store
        .read_all()
        .with_context(|| format!("read result store {}", args.store.display()))?;
    let summary = summarize_history(&records, args.dataset.as_deref());

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("Result store: {}", args.store.display());
            println!("Runs: {}", summary.run_count);
            for run in &summary.runs {
                println!(
                    "  #{} {} {}/{}: violations={}, error={}, warning={}, info={}",
                    run.run_id,
                    run.timestamp,
                    run.workspace,
                    run.dataset,
                    run.violations,
                    run.counts.error,
                    run.counts.warning,
                    run.counts.info
                );
            }
            if let Some(delta) = &summary.delta_from_previous {
                println!(
                    "Delta: violations={:+}, error={:+}, warning={:+}, info={:+}",
                    delta.violations, delta.error, delta.warning, delta.info
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>, no_default_rules: bool) -> Result<ConfigFile> {
    let user_path = path.or_else(|| {
        let p = PathBuf::from(DEFAULT_CONFIG);
        if p.exists() { Some(p) } else { None }
    });

    let Some(path) = user_path else {
        debug!("No config file found, using built-in rules");
        if no_default_rules {
            return Ok(ConfigFile::empty());
        }
        return Ok(ConfigFile::built_in());
    };

    info!("Loading config from: {}", path.display());
    let parsed = load_config_with_includes(&path, expand_env_vars)?;
    debug!("Loaded {} rule(s) from config", parsed.rule.len());

    if no_default_rules {
        return Ok(parsed);
    }

    Ok(merge_with_built_in(parsed))
}

fn expand_env_vars(content: &str) -> Result<String> {
    env_expand::expand_env_vars(content).map(|s| s.into_owned())
}

/// Built-in rules first; user rules replace same-named ones or are appended.
fn merge_with_built_in(user: ConfigFile) -> ConfigFile {
    let built = ConfigFile::built_in();
    ConfigFile {
        includes: vec![],
        defaults: user.defaults,
        rule: merge_rules(built.rule, user.rule),
    }
}
