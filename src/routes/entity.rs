//! Entity CRUD routes built from the resolved model.
//! One route group per entity; the group carries its `ResolvedEntity` as an extension.

use crate::config::ResolvedEntity;
use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put, MethodRouter},
    Extension, Router,
};
use std::sync::Arc;

pub fn entity_routes(state: AppState) -> Router {
    let mut router = Router::new();
    for entity in &state.model.entities {
        if let Some(group) = entity_group(entity.clone()) {
            router = router.merge(group);
        }
    }
    router.with_state(state)
}

/// `/{path}`, `/{path}/` and `/{path}/:id` for the entity's enabled operations.
fn entity_group(entity: Arc<ResolvedEntity>) -> Option<Router<AppState>> {
    let mut collection: Option<MethodRouter<AppState>> = None;
    if entity.allows("list") {
        collection = Some(get(list));
    }
    if entity.allows("create") {
        collection = Some(match collection {
            Some(m) => m.post(create),
            None => post(create),
        });
    }

    let mut item: Option<MethodRouter<AppState>> = None;
    if entity.allows("read") {
        item = Some(get(read));
    }
    if entity.allows("update") {
        item = Some(match item {
            Some(m) => m.put(update).patch(update),
            None => put(update).patch(update),
        });
    }
    if entity.allows("delete") {
        item = Some(match item {
            Some(m) => m.delete(delete_handler),
            None => delete(delete_handler),
        });
    }

    if collection.is_none() && item.is_none() {
        return None;
    }
    let base = format!("/{}", entity.path_segment);
    let mut router = Router::new();
    if let Some(m) = collection {
        router = router
            .route(&base, m.clone())
            .route(&format!("{}/", base), m);
    }
    if let Some(m) = item {
        router = router.route(&format!("{}/:id", base), m);
    }
    Some(router.layer(Extension(entity)))
}

