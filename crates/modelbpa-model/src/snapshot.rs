use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// An in-memory snapshot of a tabular semantic model.
///
/// Field names follow the model definition (`.bim`) JSON layout so exported
/// model files deserialize without a mapping step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SemanticModel {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    #[serde(default)]
    pub discourage_implicit_measures: bool,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub description: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_category: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub hierarchies: Vec<Hierarchy>,
    #[serde(default)]
    pub partitions: Vec<Partition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_group: Option<CalculationGroup>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Tables marked with the "Time" data category act as date tables.
    pub fn is_date_table(&self) -> bool {
        self.data_category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("time"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    #[serde(alias = "String")]
    String,
    #[serde(alias = "Int64")]
    Int64,
    #[serde(alias = "Double")]
    Double,
    #[serde(alias = "DateTime")]
    DateTime,
    #[serde(alias = "Decimal")]
    Decimal,
    #[serde(alias = "Boolean")]
    Boolean,
    #[serde(alias = "Binary")]
    Binary,
    #[serde(alias = "Variant")]
    Variant,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Int64 => "Int64",
            DataType::Double => "Double",
            DataType::DateTime => "DateTime",
            DataType::Decimal => "Decimal",
            DataType::Boolean => "Boolean",
            DataType::Binary => "Binary",
            DataType::Variant => "Variant",
            DataType::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    #[default]
    Data,
    Calculated,
    RowNumber,
    CalculatedTableColumn,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Data => "Data",
            ColumnType::Calculated => "Calculated",
            ColumnType::RowNumber => "RowNumber",
            ColumnType::CalculatedTableColumn => "CalculatedTableColumn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub description: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default = "default_true")]
    pub is_available_in_mdx: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarize_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_folder: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text_or_lines",
        skip_serializing_if = "Option::is_none"
    )]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub name: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub expression: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub description: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    pub name: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub description: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub levels: Vec<Level>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub name: String,
    #[serde(default)]
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub source: PartitionSource,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSource {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text_or_lines",
        skip_serializing_if = "Option::is_none"
    )]
    pub expression: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_text_or_lines",
        skip_serializing_if = "Option::is_none"
    )]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculationGroup {
    #[serde(default)]
    pub calculation_items: Vec<CalculationItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculationItem {
    pub name: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub expression: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub description: String,
    #[serde(default)]
    pub ordinal: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string_definition: Option<FormatStringDefinition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormatStringDefinition {
    #[serde(default, deserialize_with = "text_or_lines")]
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum CrossFilteringBehavior {
    #[default]
    OneDirection,
    BothDirections,
    Automatic,
}

impl CrossFilteringBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            CrossFilteringBehavior::OneDirection => "OneDirection",
            CrossFilteringBehavior::BothDirections => "BothDirections",
            CrossFilteringBehavior::Automatic => "Automatic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    None,
    One,
    Many,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::None => "None",
            Cardinality::One => "One",
            Cardinality::Many => "Many",
        }
    }
}

fn many() -> Cardinality {
    Cardinality::Many
}

fn one() -> Cardinality {
    Cardinality::One
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default)]
    pub name: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub cross_filtering_behavior: CrossFilteringBehavior,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "many")]
    pub from_cardinality: Cardinality,
    #[serde(default = "one")]
    pub to_cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default = "read_permission")]
    pub model_permission: String,
    #[serde(default)]
    pub members: Vec<RoleMember>,
    #[serde(default)]
    pub table_permissions: Vec<TablePermission>,
}

fn read_permission() -> String {
    "read".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleMember {
    pub member_name: String,
}

/// A row-level-security filter: the role's filter over one table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TablePermission {
    /// Name of the secured table.
    pub name: String,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub filter_expression: String,
}

/// Model files store long expressions either as one string or as an array of lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrLines {
    Text(String),
    Lines(Vec<String>),
}

impl TextOrLines {
    fn into_text(self) -> String {
        match self {
            TextOrLines::Text(s) => s,
            TextOrLines::Lines(lines) => lines.join("\n"),
        }
    }
}

fn text_or_lines<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrLines>::deserialize(deserializer)?
        .map(TextOrLines::into_text)
        .unwrap_or_default())
}

fn opt_text_or_lines<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrLines>::deserialize(deserializer)?.map(TextOrLines::into_text))
}

impl SemanticModel {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&Column> {
        self.table(table).and_then(|t| t.column(column))
    }

    pub fn has_date_table(&self) -> bool {
        self.tables.iter().any(Table::is_date_table)
    }

    pub fn all_columns(&self) -> impl Iterator<Item = (&Table, &Column)> {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter().map(move |c| (t, c)))
    }

    pub fn all_measures(&self) -> impl Iterator<Item = (&Table, &Measure)> {
        self.tables
            .iter()
            .flat_map(|t| t.measures.iter().map(move |m| (t, m)))
    }

    pub fn all_hierarchies(&self) -> impl Iterator<Item = (&Table, &Hierarchy)> {
        self.tables
            .iter()
            .flat_map(|t| t.hierarchies.iter().map(move |h| (t, h)))
    }

    pub fn all_partitions(&self) -> impl Iterator<Item = (&Table, &Partition)> {
        self.tables
            .iter()
            .flat_map(|t| t.partitions.iter().map(move |p| (t, p)))
    }

    pub fn all_calculation_items(&self) -> impl Iterator<Item = (&Table, &CalculationItem)> {
        self.tables.iter().flat_map(|t| {
            t.calculation_group
                .iter()
                .flat_map(|g| g.calculation_items.iter())
                .map(move |i| (t, i))
        })
    }

    pub fn all_rls(&self) -> impl Iterator<Item = (&Role, &TablePermission)> {
        self.roles
            .iter()
            .flat_map(|r| r.table_permissions.iter().map(move |p| (r, p)))
    }

    /// Whether the column is the "from" (many) side of any relationship.
    pub fn is_foreign_key(&self, table: &str, column: &str) -> bool {
        self.relationships
            .iter()
            .any(|r| r.from_table == table && r.from_column == column)
    }

    /// Whether the column participates in any relationship, on either side.
    pub fn is_relationship_column(&self, table: &str, column: &str) -> bool {
        self.relationships.iter().any(|r| {
            (r.from_table == table && r.from_column == column)
                || (r.to_table == table && r.to_column == column)
        })
    }

    /// Number of objects across every scope, counting the model itself once.
    pub fn object_count(&self) -> usize {
        1 + self.tables.len()
            + self.all_columns().count()
            + self.all_measures().count()
            + self.all_hierarchies().count()
            + self.all_partitions().count()
            + self.all_calculation_items().count()
            + self.relationships.len()
            + self.roles.len()
            + self.all_rls().count()
    }
}
