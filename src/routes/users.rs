//! User account and login routes.

use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", get(users::list).post(users::register))
        .route("/users/", get(users::list).post(users::register))
        .route("/users/me", get(users::me))
        .route(
            "/users/:id",
            get(users::read)
                .put(users::update)
                .patch(users::update)
                .delete(users::delete),
        )
        .with_state(state)
}

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/token", post(auth::token))
        .route("/auth/me", get(auth::me))
        .with_state(state)
}
