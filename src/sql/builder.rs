//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from resolved entity.

use crate::config::ResolvedEntity;
use serde_json::Value;
use std::collections::HashMap;

/// Hard cap applied to every list query.
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for PostgreSQL (safe: only from catalog).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

/// One WHERE predicate. Columns not in the entity are skipped by the builder.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    NotEq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match.
    Contains(String, String),
    /// Any of the columns equals the value.
    AnyEq(Vec<String>, Value),
}

impl Filter {
    pub fn eq(col: &str, v: impl Into<Value>) -> Self {
        Filter::Eq(col.to_string(), v.into())
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a value and return its placeholder cast to the column type.
    fn placeholder(&mut self, entity: &ResolvedEntity, col: &str, v: Value) -> String {
        let n = self.push_param(v);
        let cast = entity.column(col).map(|c| c.cast.as_str()).unwrap_or("text");
        format!("${}::{}", n, cast)
    }

    fn where_clause(&mut self, entity: &ResolvedEntity, filters: &[Filter]) -> String {
        let known = |c: &str| entity.column(c).is_some();
        let mut parts = Vec::new();
        for f in filters {
            match f {
                Filter::Eq(c, v) if known(c) => {
                    let ph = self.placeholder(entity, c, v.clone());
                    parts.push(format!("{} = {}", quoted(c), ph));
                }
                Filter::NotEq(c, v) if known(c) => {
                    let ph = self.placeholder(entity, c, v.clone());
                    parts.push(format!("{} <> {}", quoted(c), ph));
                }
                Filter::Gte(c, v) if known(c) => {
                    let ph = self.placeholder(entity, c, v.clone());
                    parts.push(format!("{} >= {}", quoted(c), ph));
                }
                Filter::Lte(c, v) if known(c) => {
                    let ph = self.placeholder(entity, c, v.clone());
                    parts.push(format!("{} <= {}", quoted(c), ph));
                }
                Filter::Contains(c, s) if known(c) => {
                    let n = self.push_param(Value::String(format!("%{}%", escape_like(s))));
                    parts.push(format!("{} ILIKE ${}::text", quoted(c), n));
                }
                Filter::AnyEq(cols, v) => {
                    let ors: Vec<String> = cols
                        .iter()
                        .filter(|c| known(c))
                        .map(|c| {
                            let ph = self.placeholder(entity, c, v.clone());
                            format!("{} = {}", quoted(c), ph)
                        })
                        .collect();
                    if !ors.is_empty() {
                        parts.push(format!("({})", ors.join(" OR ")));
                    }
                }
                _ => {}
            }
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(entity, &entity.pk_column, id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&entity.pk_column),
        ph
    );
    q
}

/// SELECT list with filters, ORDER BY pk, optional LIMIT/OFFSET.
pub fn select_list(
    entity: &ResolvedEntity,
    filters: &[Filter],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = q.where_clause(entity, filters);
    let order_clause = format!(" ORDER BY {}", quoted(&entity.pk_column));
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT))).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// SELECT EXISTS(...) over the filters.
pub fn exists(entity: &ResolvedEntity, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = q.where_clause(entity, filters);
    q.sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {}{}) AS \"exists\"",
        qualified_table(entity),
        where_clause
    );
    q
}

/// SELECT COUNT(*) over the filters.
pub fn count(entity: &ResolvedEntity, filters: &[Filter]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = q.where_clause(entity, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(entity), where_clause);
    q
}

/// INSERT: insertable columns present in body, plus NULL for absent columns without default.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if !entity.is_insertable(&c.name) {
            continue;
        }
        let val = match body.get(&c.name) {
            Some(v) => v.clone(),
            None if c.has_default => continue,
            None => Value::Null,
        };
        placeholders.push(q.placeholder(entity, &c.name, val));
        cols.push(quoted(&c.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        qualified_table(entity),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity)
    );
    q
}

/// UPDATE by id: SET only known, non-key columns present in body; always touches updated_at.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    // Sorted so the statement text is stable for a given body.
    let mut keys: Vec<&String> = body.keys().collect();
    keys.sort();
    let mut sets = Vec::new();
    for k in keys {
        if !entity.is_insertable(k) {
            continue;
        }
        let ph = q.placeholder(entity, k, body[k].clone());
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_ph = q.placeholder(entity, &entity.pk_column, id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        quoted(&entity.pk_column),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(entity, &entity.pk_column, id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(entity),
        quoted(&entity.pk_column),
        ph,
        select_column_list(entity)
    );
    q
}
