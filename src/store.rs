//! Database bootstrap: create the target database when it does not exist yet,
//! then open the application pool.

use crate::config::Settings;
use crate::error::{AppError, ConfigError};
use crate::sql::quoted;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;

/// Connection options for the application pool. Sessions run in UTC so naive
/// timestamps in request bodies are stored as UTC.
pub fn connect_options(database_url: &str) -> Result<PgConnectOptions, ConfigError> {
    let opts = PgConnectOptions::from_str(database_url).map_err(|e| ConfigError::Env {
        name: "DATABASE_URL",
        message: e.to_string(),
    })?;
    Ok(opts.options([("timezone", "UTC")]))
}

pub async fn connect_pool(settings: &Settings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .connect_with(connect_options(&settings.database_url)?)
        .await?;
    Ok(pool)
}

/// Connect to the server's `postgres` database and CREATE DATABASE if the
/// database named in `database_url` is missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Env {
        name: "DATABASE_URL",
        message: e.to_string(),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

/// Split `postgres://host/name?opts` into (`postgres://host/postgres?opts`, `name`).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let (without_query, query) = match url.split_once('?') {
        Some((u, q)) => (u, Some(q)),
        None => (url, None),
    };
    let authority_start = without_query.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = without_query[authority_start..]
        .find('/')
        .map(|i| authority_start + i + 1)
        .ok_or_else(|| ConfigError::Env {
            name: "DATABASE_URL",
            message: "no database name in URL".into(),
        })?;
    let db_name = without_query[path_start..].trim().to_string();
    let mut admin_url = format!("{}postgres", &without_query[..path_start]);
    if let Some(q) = query {
        admin_url.push('?');
        admin_url.push_str(q);
    }
    Ok((admin_url, db_name))
}
