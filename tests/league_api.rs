//! End-to-end API tests against a real PostgreSQL database.
//!
//! `#[sqlx::test]` creates a throwaway database per test from `DATABASE_URL`.
//! Run with `cargo test -- --ignored` when a server is available.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use league_manager::{
    apply_migrations, build_app, load_catalog, resolve, seed_demo_data, AppState, Settings,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

async fn app_for(pool: PgPool) -> (Router, String) {
    let config = load_catalog().unwrap();
    apply_migrations(&pool, &config).await.unwrap();
    let model = resolve(&config).unwrap();
    let settings = Settings {
        secret_key: "league-api-test".into(),
        ..Settings::default()
    };
    let state = AppState::new(pool, model, settings);
    let token = state.tokens.issue("tester").unwrap().access_token;
    (build_app(state), format!("Bearer {}", token))
}

async fn call(app: &Router, method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(a) = auth {
        req = req.header(header::AUTHORIZATION, a);
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn create_team(app: &Router, auth: &str, name: &str) -> i64 {
    let (status, body) = call(app, "POST", "/api/v1/teams", Some(auth), Some(json!({"name": name}))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn duplicate_team_name_conflicts(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    create_team(&app, &auth, "Arsenal FC").await;
    let (status, body) =
        call(&app, "POST", "/api/v1/teams", Some(&auth), Some(json!({"name": "Arsenal FC"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Team with this name already exists");
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn player_for_missing_team_is_not_found(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/players",
        Some(&auth),
        Some(json!({"team_id": 999, "name": "Bukayo Saka", "position": "Forward", "age": 22})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Team with id 999 not found");
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn crud_round_trip_and_delete(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    let team = create_team(&app, &auth, "Liverpool FC").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/players",
        Some(&auth),
        Some(json!({"team_id": team, "name": "Mohamed Salah", "position": "Forward", "age": 31})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let player = body["data"]["id"].as_i64().unwrap();
    assert!(body["data"]["created_at"].is_string());

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/v1/players/{}", player),
        Some(&auth),
        Some(json!({"age": 32, "id": 7777})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["age"], 32);
    assert_eq!(body["data"]["id"], player);

    let (status, _) = call(&app, "DELETE", &format!("/api/v1/players/{}", player), Some(&auth), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/api/v1/players/{}", player), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn update_into_existing_name_conflicts(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    let team = create_team(&app, &auth, "Chelsea FC").await;
    for name in ["Cole Palmer", "Reece James"] {
        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/players",
            Some(&auth),
            Some(json!({"team_id": team, "name": name, "position": "Midfielder", "age": 24})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, list) = call(&app, "GET", "/api/v1/players?limit=1&skip=1", None, None).await;
    assert_eq!(list["meta"]["count"], 1);
    assert_eq!(list["meta"]["skip"], 1);
    let second = list["data"][0]["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/v1/players/{}", second),
        Some(&auth),
        Some(json!({"name": "Cole Palmer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn register_login_and_use_token(pool: PgPool) {
    let (app, _) = app_for(pool).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": "alice", "email": "alice@example.com", "password": "s3cret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"].get("hashed_password").is_none());
    assert!(body["data"].get("password").is_none());
    assert_eq!(body["data"]["is_active"], true);

    let (status, _) = login(&app, "alice", "wrong-pass").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, token) = login(&app, "alice", "s3cret-pass").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");
    let auth = format!("Bearer {}", token["access_token"].as_str().unwrap());

    let (status, me) = call(&app, "GET", "/api/v1/users/me", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], "alice");
    assert!(me["data"].get("hashed_password").is_none());

    let (status, _) = call(&app, "GET", "/api/v1/users/me", Some("Bearer not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn transfer_moves_player_and_checks_target(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    let from = create_team(&app, &auth, "Everton FC").await;
    let to = create_team(&app, &auth, "Fulham FC").await;
    let (_, body) = call(
        &app,
        "POST",
        "/api/v1/players",
        Some(&auth),
        Some(json!({"team_id": from, "name": "Jordan Pickford", "position": "Goalkeeper", "age": 30})),
    )
    .await;
    let player = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/players/{}/transfer", player);

    let (status, _) = call(&app, "POST", &uri, Some(&auth), Some(json!({"new_team_id": 4242}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "POST", &uri, Some(&auth), Some(json!({"new_team_id": to}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["team_id"], to);

    let (_, roster) = call(&app, "GET", &format!("/api/v1/teams/{}/players", to), None, None).await;
    assert_eq!(roster["meta"]["count"], 1);
    let (status, _) = call(&app, "GET", "/api/v1/teams/4242/players", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn demo_data_loads_once(pool: PgPool) {
    let config = load_catalog().unwrap();
    apply_migrations(&pool, &config).await.unwrap();
    let model = resolve(&config).unwrap();
    assert!(seed_demo_data(&pool, &model).await.unwrap());
    assert!(!seed_demo_data(&pool, &model).await.unwrap());

    let (app, _) = app_for(pool).await;
    let (status, teams) = call(&app, "GET", "/api/v1/teams", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let team = teams["data"][0]["id"].as_i64().unwrap();
    let (status, stats) = call(&app, "GET", &format!("/api/v1/teams/{}/statistics", team), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats["data"]["total_matches"].as_i64().unwrap() >= 1);
}

async fn create(app: &Router, auth: &str, path: &str, body: Value) -> i64 {
    let (status, created) = call(app, "POST", &format!("/api/v1/{}", path), Some(auth), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["data"]["id"].as_i64().unwrap()
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> i64 {
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/users",
        None,
        Some(json!({"username": username, "email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn account_changes_apply_to_login(pool: PgPool) {
    let (app, _) = app_for(pool).await;
    let alice = register(&app, "alice", "alice@example.com", "first-pass").await;
    register(&app, "bob", "bob@example.com", "bobs-pass").await;

    let (status, token) = login(&app, "alice", "first-pass").await;
    assert_eq!(status, StatusCode::OK);
    let auth = format!("Bearer {}", token["access_token"].as_str().unwrap());
    let (status, me) = call(&app, "GET", "/api/v1/auth/me", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], "alice@example.com");
    assert!(me["data"].get("hashed_password").is_none());

    let user_uri = format!("/api/v1/users/{}", alice);
    let (status, updated) =
        call(&app, "PATCH", &user_uri, Some(&auth), Some(json!({"password": "second-pass"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["data"].get("hashed_password").is_none());
    assert_eq!(login(&app, "alice", "second-pass").await.0, StatusCode::OK);
    assert_eq!(login(&app, "alice", "first-pass").await.0, StatusCode::UNAUTHORIZED);

    let (status, body) =
        call(&app, "PATCH", &user_uri, Some(&auth), Some(json!({"email": "bob@example.com"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "User with this email already exists");

    let (status, _) = call(&app, "PATCH", &user_uri, Some(&auth), Some(json!({"is_active": false}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = login(&app, "alice", "second-pass").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Incorrect username or password");
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn experience_out_of_range_is_rejected(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    let team = create_team(&app, &auth, "Brentford FC").await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/coaches",
        Some(&auth),
        Some(json!({"team_id": team, "name": "Thomas Frank", "experience_years": 61})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/referees",
        Some(&auth),
        Some(json!({"name": "Anthony Taylor", "experience_years": 61, "nationality": "English"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, referees) = call(&app, "GET", "/api/v1/referees", None, None).await;
    assert_eq!(referees["meta"]["count"], 0);
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn referee_and_venue_searches(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    for (name, years) in [("Michael Oliver", 15), ("Sam Barrott", 5)] {
        create(
            &app,
            &auth,
            "referees",
            json!({"name": name, "experience_years": years, "nationality": "English"}),
        )
        .await;
    }
    let (status, seasoned) = call(&app, "GET", "/api/v1/referees/experience/10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seasoned["meta"]["count"], 1);
    assert_eq!(seasoned["data"][0]["name"], "Michael Oliver");

    let arena = create(
        &app,
        &auth,
        "venues",
        json!({"name": "Allianz Arena", "city": "München", "country": "Germany", "capacity": 75000}),
    )
    .await;
    create(
        &app,
        &auth,
        "venues",
        json!({"name": "Vitality Stadium", "city": "Bournemouth", "country": "England", "capacity": 11307}),
    )
    .await;

    let (status, found) = call(&app, "GET", "/api/v1/venues/city/M%C3%BCnch", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["meta"]["count"], 1);
    assert_eq!(found["data"][0]["city"], "München");
    let (_, found) = call(&app, "GET", "/api/v1/venues/city/bournemouth", None, None).await;
    assert_eq!(found["meta"]["count"], 1);

    let (_, window) = call(&app, "GET", "/api/v1/venues/capacity?min=11307&max=75000", None, None).await;
    assert_eq!(window["meta"]["count"], 2);
    let (_, window) = call(&app, "GET", "/api/v1/venues/capacity?min=11308", None, None).await;
    assert_eq!(window["meta"]["count"], 1);
    assert_eq!(window["data"][0]["name"], "Allianz Arena");
    let (status, body) = call(&app, "GET", "/api/v1/venues/capacity?min=80000&max=100", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "min capacity cannot be greater than max capacity");

    let home = create_team(&app, &auth, "FC Bayern").await;
    let away = create_team(&app, &auth, "Borussia Dortmund").await;
    create(
        &app,
        &auth,
        "matches",
        json!({"team_a_id": home, "team_b_id": away, "match_date": "2024-11-30T17:30:00Z", "venue": "Allianz Arena"}),
    )
    .await;
    let (status, fixtures) = call(&app, "GET", &format!("/api/v1/venues/{}/matches", arena), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fixtures["meta"]["count"], 1);
    let (status, stats) = call(&app, "GET", &format!("/api/v1/venues/{}/statistics", arena), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["venue_id"], arena);
    assert_eq!(stats["data"]["total_matches"], 1);
    assert!(stats["data"]["average_attendance"].is_null());
}

#[sqlx::test(migrations = false)]
#[ignore = "needs PostgreSQL via DATABASE_URL"]
async fn team_scoped_lookups_and_profiles(pool: PgPool) {
    let (app, auth) = app_for(pool).await;
    let villa = create_team(&app, &auth, "Aston Villa").await;
    let wolves = create_team(&app, &auth, "Wolverhampton").await;

    let player = create(
        &app,
        &auth,
        "players",
        json!({"team_id": villa, "name": "Ollie Watkins", "position": "Forward", "age": 28}),
    )
    .await;
    let coach = create(
        &app,
        &auth,
        "coaches",
        json!({"team_id": villa, "name": "Unai Emery", "experience_years": 20}),
    )
    .await;
    create(&app, &auth, "managers", json!({"team_id": villa, "name": "Damian Vidagany"})).await;
    create(&app, &auth, "sponsors", json!({"team_id": villa, "name": "BK8", "contract_value": 1000})).await;
    create(
        &app,
        &auth,
        "matches",
        json!({"team_a_id": wolves, "team_b_id": villa, "match_date": "2024-10-05T14:00:00Z", "venue": "Molineux"}),
    )
    .await;
    let referee = create(
        &app,
        &auth,
        "referees",
        json!({"name": "Simon Hooper", "experience_years": 8, "nationality": "English"}),
    )
    .await;

    for path in ["coaches", "managers", "sponsors", "matches"] {
        let (status, rows) = call(&app, "GET", &format!("/api/v1/{}/team/{}", path, villa), None, None).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
        assert_eq!(rows["meta"]["count"], 1, "{}", path);
        let (status, _) = call(&app, "GET", &format!("/api/v1/{}/team/9999", path), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
    }
    let (_, away_side) = call(&app, "GET", &format!("/api/v1/matches/team/{}", wolves), None, None).await;
    assert_eq!(away_side["meta"]["count"], 1);
    let (_, none) = call(&app, "GET", &format!("/api/v1/coaches/team/{}", wolves), None, None).await;
    assert_eq!(none["meta"]["count"], 0);

    let (status, stats) = call(&app, "GET", &format!("/api/v1/players/{}/statistics", player), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["player_id"], player);
    assert_eq!(stats["data"]["name"], "Ollie Watkins");
    assert_eq!(stats["data"]["total_goals"], 0);

    let (status, stats) = call(&app, "GET", &format!("/api/v1/coaches/{}/statistics", coach), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["coach_id"], coach);
    assert_eq!(stats["data"]["experience_years"], 20);

    let (status, stats) = call(&app, "GET", &format!("/api/v1/referees/{}/statistics", referee), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["referee_id"], referee);
    assert_eq!(stats["data"]["matches_officiated"], 0);

    let (status, stats) = call(&app, "GET", &format!("/api/v1/teams/{}/statistics", villa), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["total_matches"], 1);

    let (status, _) = call(&app, "GET", "/api/v1/players/9999/statistics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
