//! Load the bundled catalog and resolve it into the runtime model.

use crate::config::resolved::{ColumnInfo, Reference, ResolvedEntity, ResolvedModel, ValueKind};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

const CATALOG_JSON: &str = include_str!("../../catalog/league.json");

/// Columns every table carries even when the catalog omits them.
pub(crate) const MANAGED_TIMESTAMPS: [&str; 2] = ["created_at", "updated_at"];

/// Parse the catalog compiled into the crate.
pub fn load_catalog() -> Result<FullConfig, ConfigError> {
    parse_catalog(CATALOG_JSON)
}

pub fn parse_catalog(json: &str) -> Result<FullConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Build resolved model from the catalog (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let tables_by_name: HashMap<_, _> = config.tables.iter().map(|t| (t.name.as_str(), t)).collect();
    let label_by_table: HashMap<_, _> = config
        .api_entities
        .iter()
        .map(|a| (a.table.as_str(), a.label.as_str()))
        .collect();

    let mut entities = Vec::new();
    let mut entity_by_path = HashMap::new();
    let mut entity_by_table = HashMap::new();

    for api in &config.api_entities {
        let table = tables_by_name
            .get(api.table.as_str())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: api.table.clone(),
            })?;

        let mut columns: Vec<ColumnInfo> = table
            .columns
            .iter()
            .map(|c| {
                let (cast, kind) = column_cast(&c.type_);
                ColumnInfo {
                    name: c.name.clone(),
                    is_pk: c.name == table.primary_key,
                    nullable: c.nullable,
                    has_default: c.default.is_some() || c.type_.to_lowercase().contains("serial"),
                    cast,
                    kind,
                }
            })
            .collect();

        for name in MANAGED_TIMESTAMPS {
            if !columns.iter().any(|c| c.name == name) {
                columns.push(ColumnInfo {
                    name: name.to_string(),
                    is_pk: false,
                    nullable: false,
                    has_default: true,
                    cast: "timestamptz".into(),
                    kind: ValueKind::Timestamp,
                });
            }
        }

        let references = config
            .relationships
            .iter()
            .filter(|r| r.from_table == table.name)
            .map(|r| {
                let target_label = label_by_table.get(r.to_table.as_str()).ok_or_else(|| {
                    ConfigError::MissingReference {
                        kind: "api entity for table",
                        id: r.to_table.clone(),
                    }
                })?;
                Ok(Reference {
                    column: r.from_column.clone(),
                    target_table: r.to_table.clone(),
                    target_column: r.to_column.clone(),
                    target_label: target_label.to_string(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let entity = Arc::new(ResolvedEntity {
            schema_name: config.schema.clone(),
            table_name: table.name.clone(),
            path_segment: api.path_segment.clone(),
            label: api.label.clone(),
            pk_column: table.primary_key.clone(),
            columns,
            operations: api.operations.iter().cloned().collect(),
            updatable: api.updatable.iter().cloned().collect(),
            sensitive_columns: api.sensitive_columns.iter().cloned().collect(),
            unique: table.unique.clone(),
            references,
            distinct: api.distinct.clone(),
            validation: api.validation.clone(),
        });
        entity_by_path.insert(api.path_segment.clone(), entity.clone());
        entity_by_table.insert(table.name.clone(), entity.clone());
        entities.push(entity);
    }

    Ok(ResolvedModel {
        entities,
        entity_by_path,
        entity_by_table,
    })
}

/// Cast target and JSON kind for a DDL type name.
fn column_cast(ty: &str) -> (String, ValueKind) {
    let lower = ty.trim().to_lowercase();
    let base = lower.split('(').next().unwrap_or("").trim();
    match base {
        "bigserial" | "bigint" | "int8" => ("bigint".into(), ValueKind::Integer),
        "serial" | "integer" | "int" | "int4" => ("integer".into(), ValueKind::Integer),
        "smallint" | "int2" | "smallserial" => ("smallint".into(), ValueKind::Integer),
        "boolean" | "bool" => ("boolean".into(), ValueKind::Boolean),
        "timestamptz" | "timestamp with time zone" => ("timestamptz".into(), ValueKind::Timestamp),
        "timestamp" | "timestamp without time zone" => ("timestamp".into(), ValueKind::Timestamp),
        "date" => ("date".into(), ValueKind::Date),
        "real" | "float4" | "double precision" | "float8" => {
            ("double precision".into(), ValueKind::Float)
        }
        _ => ("text".into(), ValueKind::Text),
    }
}
