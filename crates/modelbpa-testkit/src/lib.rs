//! Shared test utilities for the modelbpa workspace.
//!
//! This crate provides:
//! - **arb**: Proptest strategies for generating valid test inputs
//! - **fixtures**: A sample model, sample configs and the findings the
//!   built-in catalog is expected to produce on it
//! - **schema**: JSON schema validators for DTOs
//!
//! # Example
//!
//! ```rust,ignore
//! use modelbpa_testkit::arb;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     fn rows_have_names(row in arb::arb_report_row()) {
//!         assert!(!row.rule_name.is_empty());
//!     }
//! }
//! ```

pub mod arb;
pub mod fixtures;
pub mod schema;

pub use arb::{
    arb_fail_on, arb_report_row, arb_rule_config, arb_rule_meta, arb_scope, arb_semantic_model,
    arb_severity,
};
pub use fixtures::{sample_configs, sample_model, sample_model_json};
pub use schema::{validate_config_file, validate_export_record, validate_report};
