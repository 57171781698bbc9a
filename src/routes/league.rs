//! League routes: team rosters and fixtures, lookups, transfers, statistics.

use crate::handlers::league::{
    by_team, coach_statistics, player_statistics, referee_statistics, referees_by_experience,
    team_matches, team_players, team_statistics, transfer, venue_matches, venue_statistics,
    venues_by_capacity, venues_by_city,
};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Extension, Router,
};

const BY_TEAM: [&str; 5] = ["players", "coaches", "managers", "sponsors", "matches"];
const TRANSFERABLE: [&str; 2] = ["players", "coaches"];

pub fn league_routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/teams/:id/players", get(team_players))
        .route("/teams/:id/matches", get(team_matches))
        .route("/teams/:id/statistics", get(team_statistics))
        .route("/players/:id/statistics", get(player_statistics))
        .route("/coaches/:id/statistics", get(coach_statistics))
        .route("/referees/:id/statistics", get(referee_statistics))
        .route("/referees/experience/:min_experience", get(referees_by_experience))
        .route("/venues/city/:city", get(venues_by_city))
        .route("/venues/capacity", get(venues_by_capacity))
        .route("/venues/:id/matches", get(venue_matches))
        .route("/venues/:id/statistics", get(venue_statistics));

    for path in BY_TEAM {
        if let Some(entity) = state.model.entity_by_path(path) {
            let group = Router::new()
                .route(&format!("/{}/team/:team_id", path), get(by_team))
                .layer(Extension(entity.clone()));
            router = router.merge(group);
        }
    }
    for path in TRANSFERABLE {
        if let Some(entity) = state.model.entity_by_path(path) {
            let group = Router::new()
                .route(&format!("/{}/:id/transfer", path), post(transfer))
                .layer(Extension(entity.clone()));
            router = router.merge(group);
        }
    }
    router.with_state(state)
}
