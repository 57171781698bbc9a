//! Integrity-checked writes on top of CrudService.
//!
//! Order of checks on create: field validation (422), distinct columns (400),
//! referenced rows exist (404), uniqueness (409), then the insert. Checks and
//! write share one transaction.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::service::{CrudService, RequestValidator};
use crate::sql::Filter;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

pub type Body = HashMap<String, Value>;

pub struct EntityService;

impl EntityService {
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        filters: &[Filter],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let mut conn = pool.acquire().await?;
        let rows = CrudService::list(&mut conn, entity, filters, limit, offset).await?;
        Ok(entity.redact_all(rows))
    }

    pub async fn get(pool: &PgPool, entity: &ResolvedEntity, id: i64) -> Result<Value, AppError> {
        let mut conn = pool.acquire().await?;
        let row = CrudService::read(&mut conn, entity, id)
            .await?
            .ok_or_else(|| not_found(entity, id))?;
        Ok(entity.redact(row))
    }

    /// Validate and insert a client body. Keys that are not insertable columns are dropped.
    pub async fn create(pool: &PgPool, entity: &ResolvedEntity, body: Body) -> Result<Value, AppError> {
        let body: Body = body
            .into_iter()
            .filter(|(k, _)| entity.is_insertable(k))
            .collect();
        RequestValidator::validate(entity, &body)?;
        check_distinct(entity, &body)?;

        let mut tx = pool.begin().await?;
        let row = Self::insert_checked(&mut tx, entity, &body).await?;
        tx.commit().await?;

        tracing::info!(entity = %entity.table_name, id = %row[&entity.pk_column], "created");
        Ok(entity.redact(row))
    }

    /// Reference and uniqueness checks, then insert. Caller has validated `body`.
    pub async fn insert_checked(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        body: &Body,
    ) -> Result<Value, AppError> {
        check_references(conn, entity, body).await?;
        check_unique(conn, entity, body, body, None).await?;
        CrudService::create(conn, entity, body).await
    }

    /// Partial update. Fields outside the entity's updatable set are ignored.
    pub async fn update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: i64,
        body: Body,
    ) -> Result<Value, AppError> {
        let body: Body = body
            .into_iter()
            .filter(|(k, _)| entity.updatable.contains(k))
            .collect();
        RequestValidator::validate_partial(entity, &body)?;

        let mut tx = pool.begin().await?;
        let row = Self::update_checked(&mut tx, entity, id, &body).await?;
        tx.commit().await?;

        tracing::info!(entity = %entity.table_name, id, "updated");
        Ok(entity.redact(row))
    }

    /// Existence, distinct, reference and uniqueness checks against the merged row, then update.
    pub async fn update_checked(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        id: i64,
        changes: &Body,
    ) -> Result<Value, AppError> {
        let existing = CrudService::read(conn, entity, id)
            .await?
            .ok_or_else(|| not_found(entity, id))?;
        let mut merged: Body = match existing {
            Value::Object(map) => map.into_iter().collect(),
            _ => Body::new(),
        };
        merged.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));

        check_distinct(entity, &merged)?;
        check_references(conn, entity, changes).await?;
        check_unique(conn, entity, &merged, changes, Some(id)).await?;

        CrudService::update(conn, entity, id, changes)
            .await?
            .ok_or_else(|| not_found(entity, id))
    }

    pub async fn delete(pool: &PgPool, entity: &ResolvedEntity, id: i64) -> Result<(), AppError> {
        let mut conn = pool.acquire().await?;
        CrudService::delete(&mut conn, entity, id)
            .await?
            .ok_or_else(|| not_found(entity, id))?;
        tracing::info!(entity = %entity.table_name, id, "deleted");
        Ok(())
    }

    /// 404 unless a row with this id exists.
    pub async fn ensure_exists(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<(), AppError> {
        let pk = entity.pk_column.as_str();
        if CrudService::exists(conn, entity, &[Filter::eq(pk, id)]).await? {
            Ok(())
        } else {
            Err(not_found(entity, id))
        }
    }
}

pub fn not_found(entity: &ResolvedEntity, id: i64) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", entity.label, id))
}

fn check_distinct(entity: &ResolvedEntity, row: &Body) -> Result<(), AppError> {
    for rule in &entity.distinct {
        let [a, b] = &rule.columns;
        match (row.get(a), row.get(b)) {
            (Some(x), Some(y)) if !x.is_null() && x == y => {
                return Err(AppError::BadRequest(rule.message.clone()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Every non-null reference column present in `body` must point at an existing row.
async fn check_references(
    conn: &mut PgConnection,
    entity: &ResolvedEntity,
    body: &Body,
) -> Result<(), AppError> {
    for r in &entity.references {
        let Some(v) = body.get(&r.column).filter(|v| !v.is_null()) else {
            continue;
        };
        let found: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {}.{} WHERE {} = $1::bigint)",
            crate::sql::quoted(&entity.schema_name),
            crate::sql::quoted(&r.target_table),
            crate::sql::quoted(&r.target_column),
        ))
        .bind(crate::sql::PgBindValue::from_json(v))
        .fetch_one(&mut *conn)
        .await?;
        if !found {
            return Err(AppError::NotFound(format!(
                "{} with id {} not found",
                r.target_label, v
            )));
        }
    }
    Ok(())
}

/// Uniqueness sets touched by `changed` must not collide with another row.
async fn check_unique(
    conn: &mut PgConnection,
    entity: &ResolvedEntity,
    row: &Body,
    changed: &Body,
    exclude_id: Option<i64>,
) -> Result<(), AppError> {
    for set in &entity.unique {
        if !set.iter().any(|c| changed.contains_key(c)) {
            continue;
        }
        let mut filters = Vec::with_capacity(set.len() + 1);
        for col in set {
            match row.get(col) {
                Some(v) if !v.is_null() => filters.push(Filter::Eq(col.clone(), v.clone())),
                _ => break,
            }
        }
        // NULLs never collide.
        if filters.len() < set.len() {
            continue;
        }
        if let Some(id) = exclude_id {
            filters.push(Filter::NotEq(entity.pk_column.clone(), Value::from(id)));
        }
        if CrudService::exists(conn, entity, &filters).await? {
            return Err(AppError::Conflict(format!(
                "{} with this {} already exists",
                entity.label,
                set.join(" and ")
            )));
        }
    }
    Ok(())
}
