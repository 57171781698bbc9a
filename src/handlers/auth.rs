//! Password login and the current-user endpoint.

use crate::auth::verify_password;
use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::handlers::users::find_by_username;
use crate::response::success_one_ok;
use crate::state::AppState;
use axum::{
    extract::{rejection::FormRejection, State},
    response::IntoResponse,
    Form, Json,
};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

const BAD_LOGIN: &str = "Incorrect username or password";

/// Form-encoded password grant. Unknown user, wrong password and inactive account look the same to the caller.
pub async fn token(
    State(state): State<AppState>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Form(req) = form.map_err(|e| AppError::Validation(e.body_text()))?;

    let user = find_by_username(&state, &req.username).await?;
    let stored_hash = user
        .as_ref()
        .filter(|u| u["is_active"].as_bool().unwrap_or(false))
        .and_then(|u| u["hashed_password"].as_str());
    let ok = match stored_hash {
        Some(hash) => verify_password(&req.password, hash),
        None => false,
    };
    if !ok {
        tracing::warn!(username = %req.username, "rejected login");
        return Err(AppError::Unauthorized(BAD_LOGIN.into()));
    }

    let issued = state.tokens.issue(&req.username)?;
    tracing::info!(username = %req.username, "issued access token");
    Ok(Json(issued))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, AppError> {
    let row = find_by_username(&state, &user.username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(success_one_ok(state.model.require_path("users")?.redact(row)))
}
