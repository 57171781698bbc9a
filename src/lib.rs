//! League manager: catalog-driven REST backend for a football league on PostgreSQL.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use auth::TokenService;
pub use config::{load_catalog, resolve, FullConfig, ResolvedEntity, ResolvedModel, Settings};
pub use error::{AppError, AuthError, ConfigError};
pub use migration::apply_migrations;
pub use response::{success_many, success_one};
pub use routes::{auth_routes, common_routes_with_ready, entity_routes, league_routes, user_routes};
pub use seed::seed_demo_data;
pub use service::{CrudService, EntityService};
pub use state::AppState;
pub use store::{connect_pool, ensure_database_exists};

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub const API_PREFIX: &str = "/api/v1";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application router: common routes at the root, the league API under `/api/v1`.
pub fn build_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .settings
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = entity_routes(state.clone())
        .merge(league_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(auth_routes(state.clone()));

    common_routes_with_ready(state)
        .nest(API_PREFIX, api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
