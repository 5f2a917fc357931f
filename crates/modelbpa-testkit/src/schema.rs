//! JSON schema validators for modelbpa DTOs.
//!
//! Schemas are generated from the DTO types with schemars, the same way
//! `cargo xtask schema` writes them to `schemas/`.

use jsonschema::JSONSchema;
use schemars::JsonSchema;

use modelbpa_types::{AnalysisReport, ConfigFile, ExportRecord};

/// Error type for schema validation failures.
#[derive(Debug)]
pub struct SchemaValidationError {
    pub errors: Vec<String>,
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schema validation failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for SchemaValidationError {}

/// Compile the schemars schema of `T`.
pub fn compile_schema<T: JsonSchema>() -> JSONSchema {
    let schema = serde_json::to_value(schemars::schema_for!(T)).expect("schema should serialize");
    JSONSchema::compile(&schema).expect("schema should compile")
}

pub fn validate_config_file(config: &ConfigFile) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(config).expect("ConfigFile should serialize to JSON");
    validate_with_schema(&compile_schema::<ConfigFile>(), &json)
}

pub fn validate_report(report: &AnalysisReport) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(report).expect("AnalysisReport should serialize to JSON");
    validate_with_schema(&compile_schema::<AnalysisReport>(), &json)
}

pub fn validate_report_json(json: &serde_json::Value) -> Result<(), SchemaValidationError> {
    validate_with_schema(&compile_schema::<AnalysisReport>(), json)
}

pub fn validate_export_record(record: &ExportRecord) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(record).expect("ExportRecord should serialize to JSON");
    validate_with_schema(&compile_schema::<ExportRecord>(), &json)
}

pub fn validate_with_schema(
    schema: &JSONSchema,
    json: &serde_json::Value,
) -> Result<(), SchemaValidationError> {
    match schema.validate(json) {
        Ok(()) => Ok(()),
        Err(errors) => Err(SchemaValidationError {
            errors: errors.map(|e| e.to_string()).collect(),
        }),
    }
}
