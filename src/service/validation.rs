//! Request validation from catalog rules and column types.

use crate::config::{ResolvedEntity, ValidationRule, ValueKind};
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full create body. All required fields must be present and non-null.
    pub fn validate(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> Result<(), AppError> {
        // Sorted so the first reported error does not depend on hash order.
        let mut rules: Vec<(&String, &ValidationRule)> = entity.validation.iter().collect();
        rules.sort_by(|a, b| a.0.cmp(b.0));
        for (col, rule) in rules {
            let val = body.get(col);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
        }
        Self::validate_present(entity, body)
    }

    /// Validate only the fields present in body (for updates). Required is not enforced for missing fields.
    pub fn validate_partial(
        entity: &ResolvedEntity,
        body: &HashMap<String, Value>,
    ) -> Result<(), AppError> {
        for (col, v) in body {
            if v.is_null() && entity.validation.get(col).and_then(|r| r.required) == Some(true) {
                return Err(AppError::Validation(format!("{} must not be null", col)));
            }
        }
        Self::validate_present(entity, body)
    }

    fn validate_present(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> Result<(), AppError> {
        let mut keys: Vec<&String> = body.keys().collect();
        keys.sort();
        for col in keys {
            let v = &body[col];
            if let Some(info) = entity.column(col) {
                if v.is_null() && !info.nullable {
                    return Err(AppError::Validation(format!("{} must not be null", col)));
                }
                check_kind(col, v, info.kind)?;
            }
            if let Some(rule) = entity.validation.get(col) {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }
}

fn check_kind(col: &str, v: &Value, kind: ValueKind) -> Result<(), AppError> {
    let ok = match (kind, v) {
        (_, Value::Null) => true,
        (ValueKind::Integer, Value::Number(n)) => n.is_i64(),
        (ValueKind::Float, Value::Number(_)) => true,
        (ValueKind::Text, Value::String(_)) => true,
        (ValueKind::Boolean, Value::Bool(_)) => true,
        (ValueKind::Timestamp, Value::String(s)) => parses_as_datetime(s),
        (ValueKind::Date, Value::String(s)) => {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be {}", col, kind.name())))
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]`. Pool sessions set `timezone=UTC`, see `store::connect_options`.
fn parses_as_datetime(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let has_text_rule = rule.format.is_some()
        || rule.max_length.is_some()
        || rule.min_length.is_some()
        || rule.pattern.is_some();
    if has_text_rule && !v.is_string() {
        return Err(AppError::Validation(format!("{} must be a string", col)));
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
        if let Some(ref pattern) = rule.pattern {
            let re = Regex::new(pattern)
                .map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!(
                    "{} does not match required pattern",
                    col
                )));
            }
        }
    }
    let numeric_rule =
        rule.minimum.is_some() || rule.maximum.is_some() || rule.exclusive_minimum.is_some();
    if numeric_rule {
        let n = v
            .as_f64()
            .ok_or_else(|| AppError::Validation(format!("{} must be a number", col)))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(min) = rule.exclusive_minimum {
            if n <= min {
                return Err(AppError::Validation(format!("{} must be greater than {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                if !is_email(s) {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// One `@`, a non-empty local part, and a dotted domain with no empty labels.
fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_catalog, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&load_catalog().unwrap()).unwrap()
    }

    fn body(v: Value) -> HashMap<String, Value> {
        serde_json::from_value(v).unwrap()
    }

    fn message(r: Result<(), AppError>) -> String {
        match r {
            Err(AppError::Validation(m)) => m,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_valid_player() {
        let m = model();
        let players = m.entity_by_path("players").unwrap();
        let b = body(json!({"team_id": 1, "name": "Bukayo Saka", "position": "Winger", "age": 22}));
        RequestValidator::validate(players, &b).unwrap();
    }

    #[test]
    fn rejects_missing_required_field() {
        let m = model();
        let players = m.entity_by_path("players").unwrap();
        let b = body(json!({"team_id": 1, "name": "Bukayo Saka", "age": 22}));
        assert_eq!(message(RequestValidator::validate(players, &b)), "position is required");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let m = model();
        let players = m.entity_by_path("players").unwrap();
        let b = body(json!({"team_id": 1, "name": "Too Young", "position": "GK", "age": 15}));
        assert!(RequestValidator::validate(players, &b).is_err());

        let venues = m.entity_by_path("venues").unwrap();
        let b = body(json!({"name": "Pitch", "city": "Leeds", "country": "England", "capacity": 0}));
        assert_eq!(
            message(RequestValidator::validate(venues, &b)),
            "capacity must be greater than 0"
        );

        let referees = m.entity_by_path("referees").unwrap();
        let b = body(json!({"experience_years": 61}));
        assert!(RequestValidator::validate_partial(referees, &b).is_err());
    }

    #[test]
    fn rejects_wrong_json_types() {
        let m = model();
        let players = m.entity_by_path("players").unwrap();
        let b = body(json!({"team_id": "one", "name": "X", "position": "GK", "age": 20}));
        assert_eq!(
            message(RequestValidator::validate(players, &b)),
            "team_id must be an integer"
        );

        let matches = m.entity_by_path("matches").unwrap();
        let b = body(json!({"match_date": "next tuesday"}));
        assert_eq!(
            message(RequestValidator::validate_partial(matches, &b)),
            "match_date must be a datetime"
        );
        let b = body(json!({"match_date": "2024-08-17T15:00:00"}));
        RequestValidator::validate_partial(matches, &b).unwrap();
    }

    #[test]
    fn partial_ignores_missing_required() {
        let m = model();
        let teams = m.entity_by_path("teams").unwrap();
        let b = body(json!({"home_ground": "Emirates Stadium"}));
        RequestValidator::validate_partial(teams, &b).unwrap();
        let b = body(json!({"founded_year": 1750}));
        assert!(RequestValidator::validate_partial(teams, &b).is_err());
    }

    #[test]
    fn null_on_non_nullable_column_is_rejected() {
        let m = model();
        let players = m.entity_by_path("players").unwrap();
        let b = body(json!({"age": null}));
        assert_eq!(
            message(RequestValidator::validate_partial(players, &b)),
            "age must not be null"
        );
    }

    #[test]
    fn user_rules_cover_email_and_username() {
        let m = model();
        let users = m.entity_by_path("users").unwrap();
        let ok = body(json!({"username": "coach.k", "email": "k@club.test", "password": "secret1"}));
        RequestValidator::validate(users, &ok).unwrap();

        let bad_email = body(json!({"username": "coach_k", "email": "k@club", "password": "secret1"}));
        assert_eq!(
            message(RequestValidator::validate(users, &bad_email)),
            "email must be a valid email"
        );

        let bad_name = body(json!({"username": "no spaces", "email": "k@club.test", "password": "secret1"}));
        assert!(RequestValidator::validate(users, &bad_name).is_err());

        let short_pw = body(json!({"username": "coach_k", "email": "k@club.test", "password": "abc"}));
        assert_eq!(
            message(RequestValidator::validate(users, &short_pw)),
            "password must be at least 6 characters"
        );
    }

    #[test]
    fn unknown_format_is_not_enforced() {
        let rule = ValidationRule {
            format: Some("uuid".into()),
            ..ValidationRule::default()
        };
        validate_field("sponsor_ref", &json!("not-a-uuid"), &rule).unwrap();
        let rule = ValidationRule {
            format: Some("email".into()),
            ..ValidationRule::default()
        };
        assert!(validate_field("email", &json!("not-an-email"), &rule).is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a b@c.de"));
        assert!(!is_email("a@b..co"));
    }
}
