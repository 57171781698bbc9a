//! Demo data. Rows go through the same validation and integrity checks as API writes.
//!
//! Seed rows may name a referenced row instead of giving its id: a `team` key
//! becomes `team_id` by looking up the team with that name.

use crate::auth::hash_password;
use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::service::{Body, CrudService, EntityService, RequestValidator};
use crate::sql::Filter;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

const SEED_JSON: &str = include_str!("../catalog/seed.json");

#[derive(Debug, Deserialize)]
pub struct SeedData {
    pub sections: Vec<SeedSection>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSection {
    pub entity: String,
    pub rows: Vec<Body>,
}

pub fn load_seed() -> Result<SeedData, ConfigError> {
    serde_json::from_str(SEED_JSON).map_err(|e| ConfigError::Load(format!("seed data: {}", e)))
}

/// Load the bundled demo data in one transaction. Returns false when teams already exist.
pub async fn seed_demo_data(pool: &PgPool, model: &ResolvedModel) -> Result<bool, AppError> {
    let teams = model.require_path("teams")?;
    let mut tx = pool.begin().await?;
    if CrudService::count(&mut tx, teams, &[]).await? > 0 {
        tracing::info!("teams present, skipping demo data");
        return Ok(false);
    }

    let seed = load_seed()?;
    for section in seed.sections {
        let entity = model.entity_by_path(&section.entity).ok_or_else(|| {
            ConfigError::MissingReference {
                kind: "seed entity",
                id: section.entity.clone(),
            }
        })?;
        let n = section.rows.len();
        for row in section.rows {
            let body = resolve_names(&mut tx, model, entity, row).await?;
            RequestValidator::validate(entity, &body)?;
            let mut body = body;
            if let Some(Value::String(pw)) = body.remove("password") {
                body.insert("hashed_password".into(), Value::String(hash_password(&pw)?));
            }
            EntityService::insert_checked(&mut tx, entity, &body).await?;
        }
        tracing::info!(entity = %entity.table_name, rows = n, "seeded");
    }
    tx.commit().await?;
    Ok(true)
}

/// Replace `team: "Arsenal FC"` style keys with the referenced id.
async fn resolve_names(
    conn: &mut PgConnection,
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    mut row: Body,
) -> Result<Body, AppError> {
    for r in &entity.references {
        let Some(alias) = r.column.strip_suffix("_id") else {
            continue;
        };
        let Some(name) = row.remove(alias) else {
            continue;
        };
        let target = model
            .entity_by_table(&r.target_table)
            .ok_or_else(|| AppError::Internal(format!("no entity for table {}", r.target_table)))?;
        let found = CrudService::find_one(conn, target, &[Filter::Eq("name".into(), name.clone())])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} named {} not found", target.label, name)))?;
        row.insert(r.column.clone(), found[&r.target_column].clone());
    }
    Ok(row)
}
