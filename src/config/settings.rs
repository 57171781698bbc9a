//! Process settings read from the environment.

use crate::error::ConfigError;
use std::str::FromStr;

/// Signing key used when `SECRET_KEY` is unset. Fine for local runs only.
const DEV_SECRET_KEY: &str = "dev-only-secret-change-me";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub seed_demo_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/football_league".into(),
            database_max_connections: 5,
            secret_key: DEV_SECRET_KEY.into(),
            access_token_expire_minutes: 60 * 24 * 7,
            bind_addr: "0.0.0.0:8000".into(),
            cors_origins: vec!["http://localhost:3000".into()],
            seed_demo_data: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secret_key = match get("SECRET_KEY") {
            Some(k) => k,
            None => {
                tracing::warn!("SECRET_KEY not set; using development signing key");
                defaults.secret_key
            }
        };

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            )?,
            secret_key,
            access_token_expire_minutes: parse(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                get("ACCESS_TOKEN_EXPIRE_MINUTES"),
                defaults.access_token_expire_minutes,
            )?,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            cors_origins: get("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            seed_demo_data: parse("SEED_DEMO_DATA", get("SEED_DEMO_DATA"), defaults.seed_demo_data)?,
        })
    }
}

fn parse<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Env {
            name,
            message: format!("'{}': {}", v, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.access_token_expire_minutes, 10080);
        assert_eq!(s.database_max_connections, 5);
        assert!(!s.seed_demo_data);
        assert_eq!(s.cors_origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("SECRET_KEY", "abc"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "15"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("SEED_DEMO_DATA", "true"),
        ])
        .unwrap();
        assert_eq!(s.secret_key, "abc");
        assert_eq!(s.access_token_expire_minutes, 15);
        assert_eq!(s.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(s.seed_demo_data);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = settings(&[("DATABASE_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "DATABASE_MAX_CONNECTIONS", .. }));
    }
}
