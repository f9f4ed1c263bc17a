//! Ad hoc SQL execution against an arbitrary engine database.
//!
//! A deliberately thin passthrough: the SQL text is executed verbatim on a
//! dedicated short-lived session and the result is decoded into column-keyed
//! JSON rows plus field metadata. No validation, sanitization, or rewriting
//! happens here; engine errors surface with their original message.

use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Either, Executor, Row, TypeInfo, ValueRef};

use futures::TryStreamExt;

/// Coordinates for one gateway execution.
#[derive(Debug, Clone)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
}

pub struct QueryOutcome {
    pub command: String,
    pub rows: Vec<Map<String, Value>>,
    pub fields: Vec<FieldInfo>,
    pub rows_affected: u64,
}

impl QueryOutcome {
    /// Returned row count for row-producing statements, affected count
    /// otherwise.
    pub fn row_count(&self) -> u64 {
        if self.rows.is_empty() {
            self.rows_affected
        } else {
            self.rows.len() as u64
        }
    }
}

/// Execute `sql` with positionally-bound JSON `params` against `target`.
/// The session is closed before returning on every path.
pub async fn execute(
    target: &ConnectionTarget,
    sql: &str,
    params: &[Value],
) -> Result<QueryOutcome, sqlx::Error> {
    let mut conn = PgConnectOptions::new()
        .host(&target.host)
        .port(target.port)
        .username(&target.username)
        .password(&target.password)
        .database(&target.database)
        .connect()
        .await?;

    let result = run(&mut conn, sql, params).await;
    conn.close().await.ok();
    result
}

async fn run(
    conn: &mut sqlx::PgConnection,
    sql: &str,
    params: &[Value],
) -> Result<QueryOutcome, sqlx::Error> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = match p {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) if n.is_i64() => query.bind(n.as_i64()),
            Value::Number(n) => query.bind(n.as_f64()),
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.clone()),
        };
    }

    let mut rows: Vec<Map<String, Value>> = Vec::new();
    let mut fields: Vec<FieldInfo> = Vec::new();
    let mut rows_affected = 0u64;

    {
        let mut stream = conn.fetch_many(query);
        while let Some(item) = stream.try_next().await? {
            match item {
                Either::Left(done) => rows_affected += done.rows_affected(),
                Either::Right(row) => {
                    if fields.is_empty() {
                        fields = field_metadata(&row);
                    }
                    rows.push(decode_row(&row));
                }
            }
        }
    }

    Ok(QueryOutcome {
        command: command_tag(sql),
        rows,
        fields,
        rows_affected,
    })
}

/// Leading SQL keyword, uppercased, standing in for the wire command tag.
fn command_tag(sql: &str) -> String {
    sql.trim()
        .split_whitespace()
        .next()
        .map(|w| w.to_ascii_uppercase())
        .unwrap_or_else(|| "QUERY".to_string())
}

fn field_metadata(row: &PgRow) -> Vec<FieldInfo> {
    row.columns()
        .iter()
        .map(|col| FieldInfo {
            name: col.name().to_string(),
            data_type: col.type_info().name().to_string(),
        })
        .collect()
}

/// Decode one row into a column-keyed JSON map, driven by the column's
/// Postgres type name. Types without a mapping fall back to text, then null.
fn decode_row(row: &PgRow) -> Map<String, Value> {
    let mut out = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        out.insert(col.name().to_string(), decode_value(row, idx));
    }
    out
}

fn decode_value(row: &PgRow, idx: usize) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => Value::Null,
        Ok(raw) => {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "BOOL" => row.try_get::<bool, _>(idx).map(Value::Bool),
                "INT2" => row.try_get::<i16, _>(idx).map(|v| json!(v)),
                "INT4" => row.try_get::<i32, _>(idx).map(|v| json!(v)),
                "INT8" => row.try_get::<i64, _>(idx).map(|v| json!(v)),
                "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| json!(v)),
                "FLOAT8" => row.try_get::<f64, _>(idx).map(|v| json!(v)),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
                    row.try_get::<String, _>(idx).map(Value::String)
                }
                "UUID" => row
                    .try_get::<uuid::Uuid, _>(idx)
                    .map(|v| Value::String(v.to_string())),
                "JSON" | "JSONB" => row.try_get::<Value, _>(idx),
                "TIMESTAMPTZ" => row
                    .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
                    .map(|v| Value::String(v.to_rfc3339())),
                "TIMESTAMP" => row
                    .try_get::<chrono::NaiveDateTime, _>(idx)
                    .map(|v| Value::String(v.to_string())),
                "DATE" => row
                    .try_get::<chrono::NaiveDate, _>(idx)
                    .map(|v| Value::String(v.to_string())),
                _ => row.try_get::<String, _>(idx).map(Value::String),
            }
            .unwrap_or(Value::Null)
        }
        Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tag() {
        assert_eq!(command_tag("SELECT 1 as ok"), "SELECT");
        assert_eq!(command_tag("  insert into t values (1)"), "INSERT");
        assert_eq!(command_tag("\nUPDATE t SET x = 1"), "UPDATE");
        assert_eq!(command_tag(""), "QUERY");
    }

    #[test]
    fn test_row_count_prefers_returned_rows() {
        let with_rows = QueryOutcome {
            command: "SELECT".to_string(),
            rows: vec![Map::new(), Map::new()],
            fields: Vec::new(),
            rows_affected: 0,
        };
        assert_eq!(with_rows.row_count(), 2);

        let affected_only = QueryOutcome {
            command: "UPDATE".to_string(),
            rows: Vec::new(),
            fields: Vec::new(),
            rows_affected: 7,
        };
        assert_eq!(affected_only.row_count(), 7);
    }
}
