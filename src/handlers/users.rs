//! User registration and account management. Passwords arrive in clear and
//! are stored only as argon2 hashes; responses never carry the hash.

use crate::auth::hash_password;
use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::handlers::entity::{body_to_map, parse_id, Page};
use crate::response::{success_one, success_one_ok, success_page};
use crate::service::{Body, CrudService, EntityService, RequestValidator};
use crate::sql::Filter;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const REGISTER_FIELDS: [&str; 4] = ["username", "email", "full_name", "password"];
const UPDATE_FIELDS: [&str; 4] = ["email", "full_name", "password", "is_active"];

/// Swap a clear `password` for `hashed_password`.
fn hash_into(body: &mut Body) -> Result<(), AppError> {
    if let Some(pw) = body.remove("password") {
        let pw = pw
            .as_str()
            .ok_or_else(|| AppError::Validation("password must be a string".into()))?;
        body.insert("hashed_password".into(), Value::String(hash_password(pw)?));
    }
    Ok(())
}

/// Active or not, the row for `username`.
pub(crate) async fn find_by_username(
    state: &AppState,
    username: &str,
) -> Result<Option<Value>, AppError> {
    let users = state.model.require_path("users")?;
    let mut conn = state.pool.acquire().await?;
    CrudService::find_one(&mut conn, users, &[Filter::eq("username", username)]).await
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.model.require_path("users")?;
    let mut body = body_to_map(body)?;
    body.retain(|k, _| REGISTER_FIELDS.contains(&k.as_str()));
    RequestValidator::validate(users, &body)?;
    hash_into(&mut body)?;

    let mut tx = state.pool.begin().await?;
    let row = EntityService::insert_checked(&mut tx, users, &body).await?;
    tx.commit().await?;

    tracing::info!(username = row["username"].as_str().unwrap_or_default(), "user registered");
    Ok(success_one(users.redact(row)))
}

pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from_query(&params)?;
    let rows = EntityService::list(&state.pool, state.model.require_path("users")?, &[], Some(page.limit), Some(page.skip)).await?;
    Ok(success_page(rows, page.skip, page.limit))
}

pub async fn read(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = EntityService::get(&state.pool, state.model.require_path("users")?, id).await?;
    Ok(success_one_ok(row))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, AppError> {
    let row = find_by_username(&state, &user.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(success_one_ok(state.model.require_path("users")?.redact(row)))
}

pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id_str): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.model.require_path("users")?;
    let id = parse_id(&id_str)?;
    let mut body = body_to_map(body)?;
    body.retain(|k, _| UPDATE_FIELDS.contains(&k.as_str()));
    RequestValidator::validate_partial(users, &body)?;
    hash_into(&mut body)?;

    let mut tx = state.pool.begin().await?;
    let row = EntityService::update_checked(&mut tx, users, id, &body).await?;
    tx.commit().await?;

    tracing::info!(id, "user updated");
    Ok(success_one_ok(users.redact(row)))
}

pub async fn delete(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    EntityService::delete(&state.pool, state.model.require_path("users")?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
