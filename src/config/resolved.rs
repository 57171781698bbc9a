//! Resolved entity model: catalog validated and flattened for runtime use.

use crate::config::{DistinctRule, ValidationRule};
use crate::error::AppError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// JSON shape a column accepts, derived from its SQL type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Date,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "an integer",
            ValueKind::Float => "a number",
            ValueKind::Text => "a string",
            ValueKind::Boolean => "a boolean",
            ValueKind::Timestamp => "a datetime",
            ValueKind::Date => "a date",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub is_pk: bool,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. NOW(), serial).
    pub has_default: bool,
    /// PostgreSQL type used to cast bound text parameters, e.g. `bigint`, `timestamptz`.
    pub cast: String,
    pub kind: ValueKind,
}

/// A by-convention reference from one of our columns to another entity's key.
#[derive(Clone, Debug)]
pub struct Reference {
    pub column: String,
    pub target_table: String,
    pub target_column: String,
    /// Label of the referenced entity, used in "not found" messages.
    pub target_label: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub label: String,
    pub pk_column: String,
    pub columns: Vec<ColumnInfo>,
    pub operations: HashSet<String>,
    pub updatable: HashSet<String>,
    /// Column names to strip from all API responses (sensitive data).
    pub sensitive_columns: HashSet<String>,
    pub unique: Vec<Vec<String>>,
    pub references: Vec<Reference>,
    pub distinct: Vec<DistinctRule>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn allows(&self, op: &str) -> bool {
        self.operations.contains(op)
    }

    /// Columns a client may supply on insert: everything but the key and managed timestamps.
    pub fn is_insertable(&self, name: &str) -> bool {
        !matches!(name, "created_at" | "updated_at")
            && self.column(name).map(|c| !c.is_pk).unwrap_or(false)
    }

    /// Remove sensitive columns from a row before it leaves the process.
    pub fn redact(&self, mut row: Value) -> Value {
        if let Value::Object(map) = &mut row {
            for col in &self.sensitive_columns {
                map.remove(col);
            }
        }
        row
    }

    pub fn redact_all(&self, rows: Vec<Value>) -> Vec<Value> {
        rows.into_iter().map(|r| self.redact(r)).collect()
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub entities: Vec<Arc<ResolvedEntity>>,
    pub entity_by_path: HashMap<String, Arc<ResolvedEntity>>,
    pub entity_by_table: HashMap<String, Arc<ResolvedEntity>>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&Arc<ResolvedEntity>> {
        self.entity_by_path.get(path)
    }

    pub fn entity_by_table(&self, table: &str) -> Option<&Arc<ResolvedEntity>> {
        self.entity_by_table.get(table)
    }

    /// Entity the code depends on by name; a catalog without it is a server fault.
    pub fn require_path(&self, path: &str) -> Result<&ResolvedEntity, AppError> {
        self.entity_by_path(path)
            .map(|e| e.as_ref())
            .ok_or_else(|| AppError::Internal(format!("entity {} missing from catalog", path)))
    }
}
