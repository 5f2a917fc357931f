//! Fuzz target for a full analysis of an arbitrary model snapshot.
//!
//! Runs the built-in catalog and checks the assembled report: every row joins
//! to a catalog rule, rows stay sorted, and the tab document has exactly one
//! active tab whenever there is anything to show.

#![no_main]

use libfuzzer_sys::fuzz_target;

use modelbpa_core::{AnalysisPlan, run_analysis};
use modelbpa_domain::BundledTranslations;
use modelbpa_model::load_model;
use modelbpa_types::{ConfigFile, FailOn};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(model) = load_model(text) else {
        return;
    };

    let config = ConfigFile::built_in();
    let plan = AnalysisPlan {
        fail_on: FailOn::Never,
        ..AnalysisPlan::default()
    };
    let run = run_analysis(&plan, &config, &model, &BundledTranslations::empty(), None)
        .expect("built-in catalog always evaluates");

    assert_eq!(run.exit_code, 0);
    for row in &run.report.rows {
        assert!(config.rule.iter().any(|r| r.name == row.rule_name));
    }
    let keys: Vec<_> = run
        .report
        .rows
        .iter()
        .map(|r| (&r.category, &r.rule_name, r.object_type.as_str(), &r.object_name))
        .collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));

    let active = run.document.tabs.iter().filter(|t| t.active).count();
    assert_eq!(active, usize::from(!run.report.rows.is_empty()));
});
