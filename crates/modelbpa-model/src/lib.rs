//! Tabular model snapshots.
//!
//! This crate loads a semantic model definition (JSON, either bare or wrapped
//! in a `.bim`-style `{ "name", "model": { ... } }` envelope) into plain
//! structs the rule engine can walk.

mod snapshot;

use std::collections::BTreeSet;

use tracing::debug;

pub use snapshot::{
    CalculationGroup, CalculationItem, Cardinality, Column, ColumnType, CrossFilteringBehavior,
    DataType, FormatStringDefinition, Hierarchy, Level, Measure, Partition, PartitionSource,
    Relationship, Role, RoleMember, SemanticModel, Table, TablePermission,
};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model definition must be a JSON object")]
    NotAnObject,

    #[error("duplicate table name '{0}'")]
    DuplicateTable(String),
}

/// Parse a model snapshot from JSON text.
///
/// When the document carries a `model` member, that member is the model and
/// the outer `name` (if any) names it.
pub fn load_model(text: &str) -> Result<SemanticModel, ModelError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Object(mut outer) = value else {
        return Err(ModelError::NotAnObject);
    };

    let mut model: SemanticModel = match outer.remove("model") {
        Some(inner) => {
            let mut model: SemanticModel = serde_json::from_value(inner)?;
            if let Some(name) = outer.get("name").and_then(|n| n.as_str()) {
                model.name = name.to_string();
            }
            model
        }
        None => serde_json::from_value(serde_json::Value::Object(outer))?,
    };

    if model.name.is_empty() {
        model.name = "Model".to_string();
    }

    let mut seen = BTreeSet::new();
    for table in &model.tables {
        if !seen.insert(table.name.as_str()) {
            return Err(ModelError::DuplicateTable(table.name.clone()));
        }
    }

    debug!(
        "Loaded model '{}': {} table(s), {} relationship(s), {} role(s)",
        model.name,
        model.tables.len(),
        model.relationships.len(),
        model.roles.len()
    );

    Ok(model)
}
