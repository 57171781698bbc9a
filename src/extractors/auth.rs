//! Bearer-token authentication extractor.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// The caller named by a valid access token. Add as a handler argument to require auth.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            AppError::Unauthorized("Could not validate credentials".into())
        })?;
        Ok(AuthUser { username: claims.sub })
    }
}

/// `Bearer <token>`, scheme case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
