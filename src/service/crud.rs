//! Generic CRUD execution against PostgreSQL.
//!
//! Every call takes a `&mut PgConnection` so the same code runs on a pooled
//! connection (reads) or inside a transaction (writes).

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::sql::{self, Filter, PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{Query, QueryScalar};
use sqlx::{PgConnection, Postgres};
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u32 = 100;

pub struct CrudService;

impl CrudService {
    /// List rows with filters, limit (default 100, max 1000), offset (default 0).
    pub async fn list(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        filters: &[Filter],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(sql::MAX_LIMIT);
        let offset = offset.unwrap_or(0);
        let q = sql::select_list(entity, filters, Some(limit), Some(offset));
        Self::query_many(conn, &q).await
    }

    /// Fetch one row by primary key.
    pub async fn read(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(entity, &Value::from(id));
        Self::query_optional(conn, &q).await
    }

    /// First row (by primary key) matching the filters.
    pub async fn find_one(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        filters: &[Filter],
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_list(entity, filters, Some(1), None);
        Self::query_optional(conn, &q).await
    }

    pub async fn exists(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        filters: &[Filter],
    ) -> Result<bool, AppError> {
        let q = sql::exists(entity, filters);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let found: bool = bind_scalar(sqlx::query_scalar(&q.sql), &q.params)
            .fetch_one(&mut *conn)
            .await?;
        Ok(found)
    }

    pub async fn count(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        filters: &[Filter],
    ) -> Result<i64, AppError> {
        let q = sql::count(entity, filters);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n: i64 = bind_scalar(sqlx::query_scalar(&q.sql), &q.params)
            .fetch_one(&mut *conn)
            .await?;
        Ok(n)
    }

    /// Insert one row. Returns the created row.
    pub async fn create(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let q = sql::insert(entity, body);
        Self::query_optional(conn, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by id. Returns the updated row, or None when the id does not exist.
    pub async fn update(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        id: i64,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update(entity, &Value::from(id), body);
        Self::query_optional(conn, &q).await
    }

    /// Delete one row by id. Returns the deleted row or None.
    pub async fn delete(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        id: i64,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::delete(entity, &Value::from(id));
        Self::query_optional(conn, &q).await
    }

    async fn query_optional(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn query_many(conn: &mut PgConnection, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    params: &[Value],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

pub(crate) fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
