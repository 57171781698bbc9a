//! Per-entity statistics. Match events are not tracked, so most counters are zero.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::{entity::not_found, CrudService};
use crate::sql::Filter;
use serde_json::{json, Map, Value};
use sqlx::PgPool;

pub struct StatsService;

impl StatsService {
    pub async fn player(pool: &PgPool, model: &ResolvedModel, id: i64) -> Result<Value, AppError> {
        let row = profile(pool, model.require_path("players")?, id).await?;
        Ok(with_counters(
            "player_id",
            &row,
            &["name", "position", "age", "team_id"],
            json!({
                "total_goals": 0,
                "matches_played": 0,
                "yellow_cards": 0,
                "red_cards": 0,
            }),
        ))
    }

    pub async fn coach(pool: &PgPool, model: &ResolvedModel, id: i64) -> Result<Value, AppError> {
        let row = profile(pool, model.require_path("coaches")?, id).await?;
        Ok(with_counters(
            "coach_id",
            &row,
            &["name", "team_id", "experience_years", "specialization", "nationality"],
            json!({
                "matches_coached": 0,
                "wins": 0,
                "losses": 0,
                "draws": 0,
                "win_percentage": 0.0,
            }),
        ))
    }

    pub async fn referee(pool: &PgPool, model: &ResolvedModel, id: i64) -> Result<Value, AppError> {
        let row = profile(pool, model.require_path("referees")?, id).await?;
        Ok(with_counters(
            "referee_id",
            &row,
            &["name", "experience_years", "nationality"],
            json!({
                "matches_officiated": 0,
                "yellow_cards_issued": 0,
                "red_cards_issued": 0,
                "penalties_awarded": 0,
            }),
        ))
    }

    /// Matches are linked to venues by the venue's name.
    pub async fn venue(pool: &PgPool, model: &ResolvedModel, id: i64) -> Result<Value, AppError> {
        let venues = model.require_path("venues")?;
        let matches = model.require_path("matches")?;
        let mut conn = pool.acquire().await?;
        let row = CrudService::read(&mut conn, venues, id)
            .await?
            .ok_or_else(|| not_found(venues, id))?;
        let total = CrudService::count(&mut conn, matches, &[Filter::Eq("venue".into(), row["name"].clone())]).await?;
        Ok(with_counters(
            "venue_id",
            &row,
            &["name", "city", "capacity", "built_year"],
            json!({
                "total_matches": total,
                "average_attendance": null,
                "total_attendance": null,
            }),
        ))
    }

    pub async fn team(pool: &PgPool, model: &ResolvedModel, id: i64) -> Result<Value, AppError> {
        let teams = model.require_path("teams")?;
        let matches = model.require_path("matches")?;
        let mut conn = pool.acquire().await?;
        let row = CrudService::read(&mut conn, teams, id)
            .await?
            .ok_or_else(|| not_found(teams, id))?;
        let either_side = Filter::AnyEq(vec!["team_a_id".into(), "team_b_id".into()], json!(id));
        let total = CrudService::count(&mut conn, matches, &[either_side]).await?;
        Ok(with_counters(
            "team_id",
            &row,
            &["name", "founded_year", "home_ground"],
            json!({
                "total_matches": total,
                "wins": 0,
                "draws": 0,
                "losses": 0,
                "goals_for": 0,
                "goals_against": 0,
                "points": 0,
            }),
        ))
    }
}

async fn profile(pool: &PgPool, entity: &ResolvedEntity, id: i64) -> Result<Value, AppError> {
    let mut conn = pool.acquire().await?;
    CrudService::read(&mut conn, entity, id)
        .await?
        .ok_or_else(|| not_found(entity, id))
}

/// `{<id_key>: id, <fields from row>..., <counters>...}`
fn with_counters(id_key: &str, row: &Value, fields: &[&str], counters: Value) -> Value {
    let mut out = Map::new();
    out.insert(id_key.to_string(), row["id"].clone());
    for f in fields {
        out.insert(f.to_string(), row.get(*f).cloned().unwrap_or(Value::Null));
    }
    if let Value::Object(c) = counters {
        out.extend(c);
    }
    Value::Object(out)
}
