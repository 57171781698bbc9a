//! Shared application state for all routes.

use crate::auth::TokenService;
use crate::config::{ResolvedModel, Settings};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Resolved once at startup; immutable afterwards.
    pub model: Arc<ResolvedModel>,
    pub tokens: Arc<TokenService>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pool: PgPool, model: ResolvedModel, settings: Settings) -> Self {
        let tokens = TokenService::new(&settings.secret_key, settings.access_token_expire_minutes);
        AppState {
            pool,
            model: Arc::new(model),
            tokens: Arc::new(tokens),
            settings: Arc::new(settings),
        }
    }
}
