//! Apply the catalog to the database: schema, tables with their UNIQUE and
//! CHECK constraints, then indexes. Every statement is idempotent.
//!
//! Relationships are not turned into foreign keys; reference checks happen in
//! the service layer before each write.

use crate::config::loader::MANAGED_TIMESTAMPS;
use crate::config::types::*;
use crate::config::{validate, FullConfig};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::PgPool;
use std::collections::HashSet;

/// Validate the catalog, then create whatever is missing.
pub async fn apply_migrations(pool: &PgPool, config: &FullConfig) -> Result<(), AppError> {
    validate(config)?;
    for sql in migration_statements(config) {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(tables = config.tables.len(), "catalog applied");
    Ok(())
}

/// DDL in dependency order.
pub fn migration_statements(config: &FullConfig) -> Vec<String> {
    let schema = quoted(&config.schema);
    let mut out = Vec::new();
    if config.schema != "public" {
        out.push(format!("CREATE SCHEMA IF NOT EXISTS {}", schema));
    }
    for t in &config.tables {
        out.push(create_table(&schema, t));
    }
    for t in &config.tables {
        for idx in &t.indexes {
            let unique = if idx.unique { "UNIQUE " } else { "" };
            let cols: Vec<String> = idx.columns.iter().map(|c| quoted(c)).collect();
            out.push(format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {}.{} ({})",
                unique,
                quoted(&idx.name),
                schema,
                quoted(&t.name),
                cols.join(", ")
            ));
        }
    }
    out
}

fn create_table(schema: &str, t: &TableConfig) -> String {
    let mut col_defs: Vec<String> = Vec::new();
    for c in &t.columns {
        let mut def = format!("{} {}", quoted(&c.name), c.type_);
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(ref d) = c.default {
            def.push_str(" DEFAULT ");
            def.push_str(d);
        }
        col_defs.push(def);
    }

    let declared: HashSet<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
    for name in MANAGED_TIMESTAMPS {
        if !declared.contains(name) {
            col_defs.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted(name)));
        }
    }

    col_defs.push(format!("PRIMARY KEY ({})", quoted(&t.primary_key)));
    for u in &t.unique {
        let cols: Vec<String> = u.iter().map(|s| quoted(s)).collect();
        col_defs.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quoted(&format!("uq_{}_{}", t.name, u.join("_"))),
            cols.join(", ")
        ));
    }
    for ch in &t.check {
        col_defs.push(format!(
            "CONSTRAINT {} CHECK ({})",
            quoted(&ch.name),
            ch.expression
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n  {}\n)",
        schema,
        quoted(&t.name),
        col_defs.join(",\n  ")
    )
}
