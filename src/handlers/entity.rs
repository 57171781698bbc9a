//! Entity CRUD handlers: list, read, create, update, delete.
//! The entity comes from an `Extension` installed per route group.

use crate::config::{ResolvedEntity, ValueKind};
use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::response::{success_one, success_one_ok, success_page};
use crate::service::{Body, EntityService, DEFAULT_LIMIT};
use crate::sql::{Filter, MAX_LIMIT};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))
}

/// Unwrap a JSON body into a field map. Malformed JSON is 400, a well-formed body of the wrong shape is 422.
pub(crate) fn body_to_map(body: Result<Json<Value>, JsonRejection>) -> Result<Body, AppError> {
    let Json(value) = body.map_err(|rejection| {
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            AppError::Validation(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    })?;
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::Validation("body must be a JSON object".into())),
    }
}

/// Typed JSON value for a query-string filter. Unparseable input stays a string.
fn query_value_for_column(entity: &ResolvedEntity, col: &str, s: &str) -> Value {
    match entity.column(col).map(|c| c.kind) {
        Some(ValueKind::Integer) => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| s.into()),
        Some(ValueKind::Float) => s.parse::<f64>().map(Value::from).unwrap_or_else(|_| s.into()),
        Some(ValueKind::Boolean) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Some(ValueKind::Boolean) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

/// `skip` (alias `offset`) and `limit` from the query string.
pub(crate) struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub(crate) fn from_query(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let number = |key: &str| -> Result<Option<u32>, AppError> {
            params
                .get(key)
                .map(|v| {
                    v.trim().parse::<u32>().map_err(|_| {
                        AppError::Validation(format!("{} must be a non-negative integer", key))
                    })
                })
                .transpose()
        };
        let skip = match number("skip")? {
            Some(n) => n,
            None => number("offset")?.unwrap_or(0),
        };
        let limit = number("limit")?.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        Ok(Page { skip, limit })
    }
}

/// Query keys that are not pagination and name a column become exact-match filters.
fn column_filters(entity: &ResolvedEntity, params: &HashMap<String, String>) -> Vec<Filter> {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    keys.into_iter()
        .filter(|k| !matches!(k.as_str(), "skip" | "offset" | "limit"))
        .filter(|k| !entity.sensitive_columns.contains(k.as_str()))
        .filter(|k| entity.column(k).is_some())
        .map(|k| Filter::Eq(k.clone(), query_value_for_column(entity, k, &params[k])))
        .collect()
}

pub async fn list(
    State(state): State<AppState>,
    Extension(entity): Extension<Arc<ResolvedEntity>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from_query(&params)?;
    let filters = column_filters(&entity, &params);
    let rows = EntityService::list(&state.pool, &entity, &filters, Some(page.limit), Some(page.skip)).await?;
    Ok(success_page(rows, page.skip, page.limit))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(entity): Extension<Arc<ResolvedEntity>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = EntityService::get(&state.pool, &entity, id).await?;
    Ok(success_one_ok(row))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(entity): Extension<Arc<ResolvedEntity>>,
    user: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    tracing::debug!(entity = %entity.table_name, user = %user.username, "create");
    let row = EntityService::create(&state.pool, &entity, body).await?;
    Ok(success_one(row))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(entity): Extension<Arc<ResolvedEntity>>,
    user: AuthUser,
    Path(id_str): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    tracing::debug!(entity = %entity.table_name, id, user = %user.username, "update");
    let row = EntityService::update(&state.pool, &entity, id, body).await?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(entity): Extension<Arc<ResolvedEntity>>,
    user: AuthUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    tracing::debug!(entity = %entity.table_name, id, user = %user.username, "delete");
    EntityService::delete(&state.pool, &entity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
