//! League lookups beyond plain CRUD: rosters, fixtures, venue searches,
//! transfers and statistics.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::handlers::entity::{body_to_map, parse_id, Page};
use crate::response::{success_one_ok, success_page};
use crate::service::{Body, CrudService, EntityService, RequestValidator, StatsService};
use crate::sql::Filter;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Rows of `entity` that reference the team through any of its team columns.
async fn rows_for_team(
    state: &AppState,
    entity: &ResolvedEntity,
    team_id: i64,
    page: &Page,
) -> Result<Vec<Value>, AppError> {
    let teams = state.model.require_path("teams")?;
    let team_columns: Vec<String> = entity
        .references
        .iter()
        .filter(|r| r.target_table == teams.table_name)
        .map(|r| r.column.clone())
        .collect();
    if team_columns.is_empty() {
        return Err(AppError::Internal(format!(
            "{} has no reference to {}",
            entity.table_name, teams.table_name
        )));
    }
    let mut conn = state.pool.acquire().await?;
    EntityService::ensure_exists(&mut conn, teams, team_id).await?;
    let filters = [Filter::AnyEq(team_columns, Value::from(team_id))];
    let rows = CrudService::list(&mut conn, entity, &filters, Some(page.limit), Some(page.skip)).await?;
    Ok(entity.redact_all(rows))
}

/// `GET /{path}/team/:team_id` for any entity that references teams.
pub async fn by_team(
    State(state): State<AppState>,
    Extension(target): Extension<Arc<ResolvedEntity>>,
    Path(team_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = parse_id(&team_id)?;
    let page = Page::from_query(&params)?;
    let rows = rows_for_team(&state, &target, team_id, &page).await?;
    Ok(success_page(rows, page.skip, page.limit))
}

pub async fn team_players(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from_query(&params)?;
    let rows = rows_for_team(&state, state.model.require_path("players")?, parse_id(&id)?, &page).await?;
    Ok(success_page(rows, page.skip, page.limit))
}

pub async fn team_matches(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from_query(&params)?;
    let rows = rows_for_team(&state, state.model.require_path("matches")?, parse_id(&id)?, &page).await?;
    Ok(success_page(rows, page.skip, page.limit))
}

pub async fn referees_by_experience(
    State(state): State<AppState>,
    Path(min_experience): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let min: i64 = min_experience
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid experience '{}'", min_experience)))?;
    let page = Page::from_query(&params)?;
    let filters = [Filter::Gte("experience_years".into(), Value::from(min))];
    let rows = EntityService::list(
        &state.pool,
        state.model.require_path("referees")?,
        &filters,
        Some(page.limit),
        Some(page.skip),
    )
    .await?;
    Ok(success_page(rows, page.skip, page.limit))
}

pub async fn venues_by_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::from_query(&params)?;
    let filters = [Filter::Contains("city".into(), city)];
    let rows = EntityService::list(
        &state.pool,
        state.model.require_path("venues")?,
        &filters,
        Some(page.limit),
        Some(page.skip),
    )
    .await?;
    Ok(success_page(rows, page.skip, page.limit))
}

/// Inclusive capacity window from `min` and `max` query parameters.
fn capacity_filters(params: &HashMap<String, String>) -> Result<Vec<Filter>, AppError> {
    let bound = |key: &str| -> Result<Option<i64>, AppError> {
        params
            .get(key)
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::Validation(format!("{} must be an integer", key)))
            })
            .transpose()
    };
    let (min, max) = (bound("min")?, bound("max")?);
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(AppError::BadRequest(
                "min capacity cannot be greater than max capacity".into(),
            ));
        }
    }
    let mut filters = Vec::new();
    if let Some(lo) = min {
        filters.push(Filter::Gte("capacity".into(), Value::from(lo)));
    }
    if let Some(hi) = max {
        filters.push(Filter::Lte("capacity".into(), Value::from(hi)));
    }
    Ok(filters)
}

pub async fn venues_by_capacity(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filters = capacity_filters(&params)?;
    let page = Page::from_query(&params)?;
    let rows = EntityService::list(
        &state.pool,
        state.model.require_path("venues")?,
        &filters,
        Some(page.limit),
        Some(page.skip),
    )
    .await?;
    Ok(success_page(rows, page.skip, page.limit))
}

/// Matches whose venue text equals the venue's name.
pub async fn venue_matches(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let page = Page::from_query(&params)?;
    let venue = EntityService::get(&state.pool, state.model.require_path("venues")?, id).await?;
    let filters = [Filter::Eq("venue".into(), venue["name"].clone())];
    let rows = EntityService::list(
        &state.pool,
        state.model.require_path("matches")?,
        &filters,
        Some(page.limit),
        Some(page.skip),
    )
    .await?;
    Ok(success_page(rows, page.skip, page.limit))
}

/// `POST /{players|coaches}/:id/transfer` with `{"new_team_id": n}`.
pub async fn transfer(
    State(state): State<AppState>,
    Extension(target): Extension<Arc<ResolvedEntity>>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let body = body_to_map(body)?;
    let new_team_id = match body.get("new_team_id") {
        None | Some(Value::Null) => {
            return Err(AppError::Validation("new_team_id is required".into()))
        }
        Some(v) => v.clone(),
    };
    let changes: Body = [("team_id".to_string(), new_team_id)].into_iter().collect();
    RequestValidator::validate_partial(&target, &changes)?;

    let mut tx = state.pool.begin().await?;
    let row = EntityService::update_checked(&mut tx, &target, id, &changes).await?;
    tx.commit().await?;

    tracing::info!(
        entity = %target.table_name,
        id,
        team_id = %changes["team_id"],
        user = %user.username,
        "transferred"
    );
    Ok(success_one_ok(target.redact(row)))
}

pub async fn team_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(StatsService::team(&state.pool, &state.model, parse_id(&id)?).await?))
}

pub async fn player_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(StatsService::player(&state.pool, &state.model, parse_id(&id)?).await?))
}

pub async fn coach_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(StatsService::coach(&state.pool, &state.model, parse_id(&id)?).await?))
}

pub async fn referee_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(StatsService::referee(&state.pool, &state.model, parse_id(&id)?).await?))
}

pub async fn venue_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(StatsService::venue(&state.pool, &state.model, parse_id(&id)?).await?))
}
