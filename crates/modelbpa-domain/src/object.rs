//! Borrowed handles to model objects and the properties rules can inspect.

use std::borrow::Cow;

use modelbpa_model::{
    CalculationItem, Column, Hierarchy, Measure, Partition, Relationship, Role, SemanticModel,
    Table, TablePermission,
};
use modelbpa_types::{MODEL_OBJECT_NAME, PropertyValue, ScopeName};

/// A predicate could not be evaluated against one object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredicateError {
    #[error("property '{property}' is not defined for scope '{scope}'")]
    UnknownProperty { scope: ScopeName, property: String },

    #[error("property '{property}' holds {found}, expected {expected}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("dangling reference: {0}")]
    DanglingReference(String),

    #[error("{0}")]
    Failed(String),
}

/// The value type of a property, checked when conditions are compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Bool,
    Int,
}

impl PropertyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKind::Text => "text",
            PropertyKind::Bool => "bool",
            PropertyKind::Int => "int",
        }
    }
}

use PropertyKind::{Bool, Int, Text};

const MODEL_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("culture", Text),
    ("table_count", Int),
    ("relationship_count", Int),
    ("role_count", Int),
    ("has_date_table", Bool),
    ("discourage_implicit_measures", Bool),
];

const TABLE_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("description", Text),
    ("is_hidden", Bool),
    ("data_category", Text),
    ("column_count", Int),
    ("measure_count", Int),
    ("partition_count", Int),
    ("is_calculation_group", Bool),
    ("is_date_table", Bool),
    ("in_relationship", Bool),
];

const COLUMN_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("table", Text),
    ("description", Text),
    ("data_type", Text),
    ("column_type", Text),
    ("is_hidden", Bool),
    ("is_key", Bool),
    ("is_available_in_mdx", Bool),
    ("format_string", Text),
    ("summarize_by", Text),
    ("data_category", Text),
    ("sort_by_column", Text),
    ("display_folder", Text),
    ("expression", Text),
    ("is_foreign_key", Bool),
    ("is_relationship_key", Bool),
];

const MEASURE_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("table", Text),
    ("expression", Text),
    ("description", Text),
    ("format_string", Text),
    ("is_hidden", Bool),
    ("display_folder", Text),
];

const HIERARCHY_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("table", Text),
    ("description", Text),
    ("is_hidden", Bool),
    ("level_count", Int),
];

const RELATIONSHIP_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("from_table", Text),
    ("from_column", Text),
    ("to_table", Text),
    ("to_column", Text),
    ("cross_filtering_behavior", Text),
    ("is_bidirectional", Bool),
    ("is_active", Bool),
    ("from_cardinality", Text),
    ("to_cardinality", Text),
    ("from_data_type", Text),
    ("to_data_type", Text),
    ("data_types_match", Bool),
];

const ROLE_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("model_permission", Text),
    ("member_count", Int),
    ("table_permission_count", Int),
];

const PARTITION_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("table", Text),
    ("mode", Text),
    ("source_type", Text),
    ("expression", Text),
];

const RLS_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("role", Text),
    ("table", Text),
    ("filter_expression", Text),
];

const CALCULATION_ITEM_PROPERTIES: &[(&str, PropertyKind)] = &[
    ("name", Text),
    ("table", Text),
    ("expression", Text),
    ("description", Text),
    ("ordinal", Int),
    ("format_string_expression", Text),
];

/// Properties a condition may reference for objects of `scope`.
pub fn properties(scope: ScopeName) -> &'static [(&'static str, PropertyKind)] {
    match scope {
        ScopeName::Model => MODEL_PROPERTIES,
        ScopeName::Table => TABLE_PROPERTIES,
        ScopeName::Column => COLUMN_PROPERTIES,
        ScopeName::Measure => MEASURE_PROPERTIES,
        ScopeName::Hierarchy => HIERARCHY_PROPERTIES,
        ScopeName::Relationship => RELATIONSHIP_PROPERTIES,
        ScopeName::Role => ROLE_PROPERTIES,
        ScopeName::Partition => PARTITION_PROPERTIES,
        ScopeName::RowLevelSecurity => RLS_PROPERTIES,
        ScopeName::CalculationItem => CALCULATION_ITEM_PROPERTIES,
    }
}

pub fn property_kind(scope: ScopeName, property: &str) -> Option<PropertyKind> {
    properties(scope)
        .iter()
        .find(|(name, _)| *name == property)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, Copy)]
pub enum ObjectKind<'m> {
    Model,
    Table(&'m Table),
    Column(&'m Table, &'m Column),
    Measure(&'m Table, &'m Measure),
    Hierarchy(&'m Table, &'m Hierarchy),
    Relationship(&'m Relationship),
    Role(&'m Role),
    Partition(&'m Table, &'m Partition),
    RowLevelSecurity(&'m Role, &'m TablePermission),
    CalculationItem(&'m Table, &'m CalculationItem),
}

/// One object of a model, borrowed for the duration of a run.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'m> {
    model: &'m SemanticModel,
    kind: ObjectKind<'m>,
}

impl<'m> ObjectRef<'m> {
    pub fn new(model: &'m SemanticModel, kind: ObjectKind<'m>) -> Self {
        Self { model, kind }
    }

    pub fn model(&self) -> &'m SemanticModel {
        self.model
    }

    pub fn kind(&self) -> ObjectKind<'m> {
        self.kind
    }

    pub fn scope(&self) -> ScopeName {
        match self.kind {
            ObjectKind::Model => ScopeName::Model,
            ObjectKind::Table(_) => ScopeName::Table,
            ObjectKind::Column(..) => ScopeName::Column,
            ObjectKind::Measure(..) => ScopeName::Measure,
            ObjectKind::Hierarchy(..) => ScopeName::Hierarchy,
            ObjectKind::Relationship(_) => ScopeName::Relationship,
            ObjectKind::Role(_) => ScopeName::Role,
            ObjectKind::Partition(..) => ScopeName::Partition,
            ObjectKind::RowLevelSecurity(..) => ScopeName::RowLevelSecurity,
            ObjectKind::CalculationItem(..) => ScopeName::CalculationItem,
        }
    }

    /// Read one property. `Ok(None)` means the property exists for this
    /// scope but has no value on this object.
    pub fn property(&self, name: &str) -> Result<Option<PropertyValue>, PredicateError> {
        let value = match self.kind {
            ObjectKind::Model => self.model_property(name),
            ObjectKind::Table(t) => table_property(self.model, t, name),
            ObjectKind::Column(t, c) => column_property(self.model, t, c, name),
            ObjectKind::Measure(t, m) => measure_property(t, m, name),
            ObjectKind::Hierarchy(t, h) => hierarchy_property(t, h, name),
            ObjectKind::Relationship(r) => relationship_property(self.model, r, name)?,
            ObjectKind::Role(r) => role_property(r, name),
            ObjectKind::Partition(t, p) => partition_property(t, p, name),
            ObjectKind::RowLevelSecurity(r, p) => rls_property(r, p, name),
            ObjectKind::CalculationItem(t, i) => calculation_item_property(t, i, name),
        };
        value.ok_or_else(|| PredicateError::UnknownProperty {
            scope: self.scope(),
            property: name.to_string(),
        })
    }

    fn model_property(&self, name: &str) -> Option<Option<PropertyValue>> {
        let m = self.model;
        Some(match name {
            "name" => text(&m.name),
            "culture" => opt_text(m.culture.as_deref()),
            "table_count" => count(m.tables.len()),
            "relationship_count" => count(m.relationships.len()),
            "role_count" => count(m.roles.len()),
            "has_date_table" => flag(m.has_date_table()),
            "discourage_implicit_measures" => flag(m.discourage_implicit_measures),
            _ => return None,
        })
    }
}

// Each lookup returns `None` for an unknown property name and `Some(value)`
// otherwise, so the caller can tell the two apart.

fn text(s: &str) -> Option<PropertyValue> {
    Some(PropertyValue::Text(s.to_string()))
}

fn opt_text(s: Option<&str>) -> Option<PropertyValue> {
    s.map(|s| PropertyValue::Text(s.to_string()))
}

fn flag(b: bool) -> Option<PropertyValue> {
    Some(PropertyValue::Bool(b))
}

fn count(n: usize) -> Option<PropertyValue> {
    Some(PropertyValue::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

fn table_property(
    model: &SemanticModel,
    t: &Table,
    name: &str,
) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&t.name),
        "description" => text(&t.description),
        "is_hidden" => flag(t.is_hidden),
        "data_category" => opt_text(t.data_category.as_deref()),
        "column_count" => count(t.columns.len()),
        "measure_count" => count(t.measures.len()),
        "partition_count" => count(t.partitions.len()),
        "is_calculation_group" => flag(t.calculation_group.is_some()),
        "is_date_table" => flag(t.is_date_table()),
        "in_relationship" => flag(
            model
                .relationships
                .iter()
                .any(|r| r.from_table == t.name || r.to_table == t.name),
        ),
        _ => return None,
    })
}

fn column_property(
    model: &SemanticModel,
    t: &Table,
    c: &Column,
    name: &str,
) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&c.name),
        "table" => text(&t.name),
        "description" => text(&c.description),
        "data_type" => text(c.data_type.as_str()),
        "column_type" => text(c.column_type.as_str()),
        "is_hidden" => flag(c.is_hidden),
        "is_key" => flag(c.is_key),
        "is_available_in_mdx" => flag(c.is_available_in_mdx),
        "format_string" => opt_text(c.format_string.as_deref()),
        "summarize_by" => opt_text(c.summarize_by.as_deref()),
        "data_category" => opt_text(c.data_category.as_deref()),
        "sort_by_column" => opt_text(c.sort_by_column.as_deref()),
        "display_folder" => opt_text(c.display_folder.as_deref()),
        "expression" => opt_text(c.expression.as_deref()),
        "is_foreign_key" => flag(model.is_foreign_key(&t.name, &c.name)),
        "is_relationship_key" => flag(model.is_relationship_column(&t.name, &c.name)),
        _ => return None,
    })
}

fn measure_property(t: &Table, m: &Measure, name: &str) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&m.name),
        "table" => text(&t.name),
        "expression" => text(&m.expression),
        "description" => text(&m.description),
        "format_string" => opt_text(m.format_string.as_deref()),
        "is_hidden" => flag(m.is_hidden),
        "display_folder" => opt_text(m.display_folder.as_deref()),
        _ => return None,
    })
}

fn hierarchy_property(t: &Table, h: &Hierarchy, name: &str) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&h.name),
        "table" => text(&t.name),
        "description" => text(&h.description),
        "is_hidden" => flag(h.is_hidden),
        "level_count" => count(h.levels.len()),
        _ => return None,
    })
}

fn relationship_property(
    model: &SemanticModel,
    r: &Relationship,
    name: &str,
) -> Result<Option<Option<PropertyValue>>, PredicateError> {
    let endpoint_type = |table: &str, column: &str| {
        model
            .column(table, column)
            .map(|c| c.data_type)
            .ok_or_else(|| {
                PredicateError::DanglingReference(format!(
                    "relationship endpoint {} does not exist",
                    dax_object_name(table, column)
                ))
            })
    };

    Ok(Some(match name {
        "name" => text(&r.name),
        "from_table" => text(&r.from_table),
        "from_column" => text(&r.from_column),
        "to_table" => text(&r.to_table),
        "to_column" => text(&r.to_column),
        "cross_filtering_behavior" => text(r.cross_filtering_behavior.as_str()),
        "is_bidirectional" => flag(matches!(
            r.cross_filtering_behavior,
            modelbpa_model::CrossFilteringBehavior::BothDirections
        )),
        "is_active" => flag(r.is_active),
        "from_cardinality" => text(r.from_cardinality.as_str()),
        "to_cardinality" => text(r.to_cardinality.as_str()),
        "from_data_type" => text(endpoint_type(&r.from_table, &r.from_column)?.as_str()),
        "to_data_type" => text(endpoint_type(&r.to_table, &r.to_column)?.as_str()),
        "data_types_match" => flag(
            endpoint_type(&r.from_table, &r.from_column)?
                == endpoint_type(&r.to_table, &r.to_column)?,
        ),
        _ => return Ok(None),
    }))
}

fn role_property(r: &Role, name: &str) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&r.name),
        "model_permission" => text(&r.model_permission),
        "member_count" => count(r.members.len()),
        "table_permission_count" => count(r.table_permissions.len()),
        _ => return None,
    })
}

fn partition_property(t: &Table, p: &Partition, name: &str) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&p.name),
        "table" => text(&t.name),
        "mode" => opt_text(p.mode.as_deref()),
        "source_type" => opt_text(p.source.kind.as_deref()),
        "expression" => opt_text(p.source.expression.as_deref().or(p.source.query.as_deref())),
        _ => return None,
    })
}

fn rls_property(r: &Role, p: &TablePermission, name: &str) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" | "table" => text(&p.name),
        "role" => text(&r.name),
        "filter_expression" => text(&p.filter_expression),
        _ => return None,
    })
}

fn calculation_item_property(
    t: &Table,
    i: &CalculationItem,
    name: &str,
) -> Option<Option<PropertyValue>> {
    Some(match name {
        "name" => text(&i.name),
        "table" => text(&t.name),
        "expression" => text(&i.expression),
        "description" => text(&i.description),
        "ordinal" => Some(PropertyValue::Int(i.ordinal)),
        "format_string_expression" => opt_text(
            i.format_string_definition
                .as_ref()
                .map(|d| d.expression.as_str()),
        ),
        _ => return None,
    })
}

// ── Naming ─────────────────────────────────────────────────────

/// Quote a table name for use in a DAX reference. Plain identifiers are left
/// bare; anything else is wrapped in single quotes with inner quotes doubled.
pub fn quote_table(name: &str) -> Cow<'_, str> {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("'{}'", name.replace('\'', "''")))
    }
}

/// `Table[Object]`, the fully qualified form used for table-owned objects.
pub fn dax_object_name(table: &str, object: &str) -> String {
    format!("{}[{}]", quote_table(table), object)
}

/// The display name recorded for an object in violation rows.
pub fn qualified_name(object: &ObjectRef<'_>) -> String {
    match object.kind {
        ObjectKind::Model => MODEL_OBJECT_NAME.to_string(),
        ObjectKind::Table(t) => t.name.clone(),
        ObjectKind::Measure(_, m) => m.name.clone(),
        ObjectKind::Role(r) => r.name.clone(),
        ObjectKind::Column(t, c) => dax_object_name(&t.name, &c.name),
        ObjectKind::Hierarchy(t, h) => dax_object_name(&t.name, &h.name),
        ObjectKind::Partition(t, p) => dax_object_name(&t.name, &p.name),
        ObjectKind::CalculationItem(t, i) => dax_object_name(&t.name, &i.name),
        ObjectKind::RowLevelSecurity(r, p) => dax_object_name(&r.name, &p.name),
        ObjectKind::Relationship(r) => format!(
            "{} -> {}",
            dax_object_name(&r.from_table, &r.from_column),
            dax_object_name(&r.to_table, &r.to_column)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelbpa_model::load_model;

    fn model() -> SemanticModel {
        load_model(
            r#"{
                "name": "M",
                "tables": [
                    { "name": "Fact Sales",
                      "columns": [
                        { "name": "Amount", "dataType": "double", "description": "net" },
                        { "name": "DateKey", "dataType": "int64" }
                      ] },
                    { "name": "Date", "columns": [ { "name": "DateKey", "dataType": "dateTime" } ] }
                ],
                "relationships": [
                    { "fromTable": "Fact Sales", "fromColumn": "DateKey", "toTable": "Date", "toColumn": "DateKey" },
                    { "fromTable": "Fact Sales", "fromColumn": "Gone", "toTable": "Date", "toColumn": "DateKey" }
                ],
                "roles": [ { "name": "Reader", "tablePermissions": [ { "name": "Date", "filterExpression": "TRUE()" } ] } ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn quote_table_only_quotes_non_identifiers() {
        assert_eq!(quote_table("Sales"), "Sales");
        assert_eq!(quote_table("_t1"), "_t1");
        assert_eq!(quote_table("Fact Sales"), "'Fact Sales'");
        assert_eq!(quote_table("1Table"), "'1Table'");
        assert_eq!(quote_table("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn qualified_names_per_kind() {
        let m = model();
        let t = &m.tables[0];
        let col = ObjectRef::new(&m, ObjectKind::Column(t, &t.columns[0]));
        assert_eq!(qualified_name(&col), "'Fact Sales'[Amount]");

        let rel = ObjectRef::new(&m, ObjectKind::Relationship(&m.relationships[0]));
        assert_eq!(qualified_name(&rel), "'Fact Sales'[DateKey] -> Date[DateKey]");

        let role = &m.roles[0];
        let rls = ObjectRef::new(&m, ObjectKind::RowLevelSecurity(role, &role.table_permissions[0]));
        assert_eq!(qualified_name(&rls), "Reader[Date]");

        assert_eq!(qualified_name(&ObjectRef::new(&m, ObjectKind::Model)), "Model");
    }

    #[test]
    fn role_names_are_quoted_like_tables() {
        let m = load_model(
            r#"{
                "name": "M",
                "tables": [ { "name": "Date" } ],
                "roles": [ { "name": "Sales Readers", "tablePermissions": [ { "name": "Date", "filterExpression": "TRUE()" } ] } ]
            }"#,
        )
        .unwrap();
        let role = &m.roles[0];
        let rls = ObjectRef::new(&m, ObjectKind::RowLevelSecurity(role, &role.table_permissions[0]));
        assert_eq!(qualified_name(&rls), "'Sales Readers'[Date]");
    }

    #[test]
    fn column_properties_resolve() {
        let m = model();
        let t = &m.tables[0];
        let col = ObjectRef::new(&m, ObjectKind::Column(t, &t.columns[1]));
        assert_eq!(col.property("data_type").unwrap(), Some("Int64".into()));
        assert_eq!(col.property("is_foreign_key").unwrap(), Some(true.into()));
        assert_eq!(col.property("format_string").unwrap(), None);
        assert!(matches!(
            col.property("nope"),
            Err(PredicateError::UnknownProperty { scope: ScopeName::Column, .. })
        ));
    }

    #[test]
    fn dangling_relationship_endpoint_is_an_error() {
        let m = model();
        let ok = ObjectRef::new(&m, ObjectKind::Relationship(&m.relationships[0]));
        assert_eq!(ok.property("data_types_match").unwrap(), Some(false.into()));

        let bad = ObjectRef::new(&m, ObjectKind::Relationship(&m.relationships[1]));
        assert!(matches!(
            bad.property("from_data_type"),
            Err(PredicateError::DanglingReference(_))
        ));
        assert_eq!(bad.property("is_active").unwrap(), Some(true.into()));
    }

    #[test]
    fn every_declared_property_resolves() {
        let m = model();
        let t = &m.tables[0];
        let role = &m.roles[0];
        let objects = [
            ObjectRef::new(&m, ObjectKind::Model),
            ObjectRef::new(&m, ObjectKind::Table(t)),
            ObjectRef::new(&m, ObjectKind::Column(t, &t.columns[0])),
            ObjectRef::new(&m, ObjectKind::Relationship(&m.relationships[0])),
            ObjectRef::new(&m, ObjectKind::Role(role)),
            ObjectRef::new(&m, ObjectKind::RowLevelSecurity(role, &role.table_permissions[0])),
        ];
        for obj in objects {
            for (name, _) in properties(obj.scope()) {
                assert!(obj.property(name).is_ok(), "{}.{name}", obj.scope());
            }
        }
    }
}
