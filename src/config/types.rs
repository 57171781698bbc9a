//! Raw catalog types matching `catalog/league.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableCheck {
    pub name: String,
    pub expression: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// PostgreSQL column type as written in DDL, e.g. `varchar(100)`, `bigserial`.
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// SQL expression used as column default.
    #[serde(default)]
    pub default: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default)]
    pub check: Vec<TableCheck>,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
}

/// Reference by convention: `from_table.from_column` holds an id of `to_table.to_column`.
/// Not emitted as a database foreign key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Strict lower bound (value must be greater than this).
    #[serde(default)]
    pub exclusive_minimum: Option<f64>,
}

/// Two columns of one row that must not hold the same value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistinctRule {
    pub columns: [String; 2],
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiEntityConfig {
    pub table: String,
    pub path_segment: String,
    /// Singular display name used in messages ("Team with id 3 not found").
    pub label: String,
    /// Subset of list, read, create, update, delete exposed by the generic routes.
    pub operations: Vec<String>,
    /// Columns accepted by update; everything else in an update body is ignored.
    #[serde(default)]
    pub updatable: Vec<String>,
    /// Column names that must never be exposed in API responses.
    #[serde(default)]
    pub sensitive_columns: Vec<String>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    #[serde(default)]
    pub distinct: Vec<DistinctRule>,
}

/// Whole catalog in one struct.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
    pub api_entities: Vec<ApiEntityConfig>,
}

fn default_schema() -> String {
    "public".into()
}
