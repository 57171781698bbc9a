//! Catalog validation: referential integrity and API consistency.

use crate::config::FullConfig;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

const OPERATIONS: &[&str] = &["list", "read", "create", "update", "delete"];

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.schema.trim().is_empty() {
        return Err(ConfigError::Validation("schema name must not be empty".into()));
    }

    let mut columns_by_table: HashMap<&str, HashSet<&str>> = HashMap::new();
    for t in &config.tables {
        let cols: HashSet<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
        if cols.len() != t.columns.len() {
            return Err(ConfigError::Validation(format!(
                "table {} declares a column twice",
                t.name
            )));
        }
        if !cols.contains(t.primary_key.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                table: t.name.clone(),
                column: t.primary_key.clone(),
            });
        }
        for set in &t.unique {
            check_columns(&t.name, &cols, set.iter())?;
        }
        for idx in &t.indexes {
            check_columns(&t.name, &cols, idx.columns.iter())?;
        }
        if columns_by_table.insert(t.name.as_str(), cols).is_some() {
            return Err(ConfigError::Validation(format!("table {} declared twice", t.name)));
        }
    }

    for r in &config.relationships {
        let from = columns_by_table
            .get(r.from_table.as_str())
            .ok_or_else(|| missing("table", &r.from_table))?;
        let to = columns_by_table
            .get(r.to_table.as_str())
            .ok_or_else(|| missing("table", &r.to_table))?;
        if !from.contains(r.from_column.as_str()) {
            return Err(missing("column", &format!("{}.{}", r.from_table, r.from_column)));
        }
        if !to.contains(r.to_column.as_str()) {
            return Err(missing("column", &format!("{}.{}", r.to_table, r.to_column)));
        }
    }

    let mut path_segments = HashSet::new();
    for api in &config.api_entities {
        let cols = columns_by_table
            .get(api.table.as_str())
            .ok_or_else(|| missing("table", &api.table))?;
        if !path_segments.insert(api.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(api.path_segment.clone()));
        }
        if let Some(op) = api.operations.iter().find(|o| !OPERATIONS.contains(&o.as_str())) {
            return Err(ConfigError::Validation(format!(
                "unknown operation '{}' on {}",
                op, api.path_segment
            )));
        }
        check_columns(&api.table, cols, api.updatable.iter())?;
        check_columns(&api.table, cols, api.sensitive_columns.iter())?;
        for rule in &api.distinct {
            check_columns(&api.table, cols, rule.columns.iter())?;
        }
        for (field, rule) in &api.validation {
            if let Some(pattern) = &rule.pattern {
                regex::Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("invalid pattern for {}: {}", field, e))
                })?;
            }
        }
    }

    Ok(())
}

fn check_columns<'a>(
    table: &str,
    cols: &HashSet<&str>,
    names: impl Iterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    for n in names {
        if !cols.contains(n.as_str()) {
            return Err(missing("column", &format!("{}.{}", table, n)));
        }
    }
    Ok(())
}

fn missing(kind: &'static str, id: &str) -> ConfigError {
    ConfigError::MissingReference {
        kind,
        id: id.to_string(),
    }
}
