//! SQL gateway endpoints.
//!
//! `/execute-sql` requires authentication and validates that the target
//! database is registered and visible to the caller before executing.
//! `/direct-sql` is the open bootstrap variant: no authentication, raw
//! coordinates from the request body with local-engine defaults. The
//! asymmetry is intentional (internal callers depend on the open path).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::engine::engine_message;
use crate::error::{ApiError, ErrorBody};
use crate::gateway::{self, ConnectionTarget, FieldInfo};
use crate::registry;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteSqlRequest {
    pub sql: String,
    pub connection: Option<ConnectionOverride>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConnectionOverride {
    pub database: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSqlResponse {
    pub success: bool,
    pub command: String,
    pub row_count: u64,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Map<String, Value>>,
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DirectSqlRequest {
    /// SQL text; `query` and `sql` are interchangeable aliases.
    pub query: Option<String>,
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Vec<Value>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DirectSqlResponse {
    pub success: bool,
    pub rows_affected: u64,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Map<String, Value>>,
    pub fields: Vec<FieldInfo>,
    pub command: String,
}

/// Execute SQL against a registered database the caller owns (or any
/// registration, for admins). The registration's stored coordinates are
/// used for the session.
#[utoipa::path(
    post,
    path = "/execute-sql",
    tag = "SQL",
    request_body = ExecuteSqlRequest,
    responses(
        (status = 200, description = "Execution result", body = ExecuteSqlResponse),
        (status = 400, description = "Missing target or engine rejected the SQL", body = ErrorBody),
        (status = 401, description = "Invalid or expired token", body = ErrorBody),
        (status = 404, description = "Database not registered or not visible", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn execute_sql(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<ExecuteSqlRequest>,
) -> Result<Json<ExecuteSqlResponse>, ApiError> {
    if req.sql.trim().is_empty() {
        return Err(ApiError::Validation("sql is required".to_string()));
    }
    let database = req
        .connection
        .and_then(|c| c.database)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::Validation("connection.database is required".to_string()))?;

    let reg = registry::find_visible_by_name(&state.pool, &user, &database)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("database '{}' is not registered", database))
        })?;

    let target = ConnectionTarget {
        host: reg.host,
        port: reg.port as u16,
        username: reg.username,
        password: reg.password,
        database: reg.name,
    };

    let outcome = gateway::execute(&target, &req.sql, &[])
        .await
        .map_err(|e| ApiError::Upstream(engine_message(&e)))?;

    Ok(Json(ExecuteSqlResponse {
        success: true,
        command: outcome.command.clone(),
        row_count: outcome.row_count(),
        rows: outcome.rows,
        fields: outcome.fields,
    }))
}

/// Execute SQL with raw connection coordinates and no authentication.
/// Coordinates default to the local engine's administrative database.
#[utoipa::path(
    post,
    path = "/direct-sql",
    tag = "SQL",
    request_body = DirectSqlRequest,
    responses(
        (status = 200, description = "Execution result", body = DirectSqlResponse),
        (status = 400, description = "Missing SQL text", body = ErrorBody),
        (status = 500, description = "Engine rejected the SQL", body = ErrorBody)
    )
)]
pub async fn direct_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DirectSqlRequest>,
) -> Result<Json<DirectSqlResponse>, ApiError> {
    let sql = req
        .query
        .or(req.sql)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("query (or sql) is required".to_string()))?;

    let defaults = &state.config.local_engine;
    let target = ConnectionTarget {
        host: req.host.unwrap_or_else(|| defaults.host.clone()),
        port: req.port.unwrap_or(defaults.port),
        username: req.user.unwrap_or_else(|| defaults.username.clone()),
        password: req.password.unwrap_or_else(|| defaults.password.clone()),
        database: req
            .database
            .unwrap_or_else(|| defaults.admin_database.clone()),
    };

    let outcome = gateway::execute(&target, &sql, &req.params)
        .await
        .map_err(|e| ApiError::EngineFailed(engine_message(&e)))?;

    Ok(Json(DirectSqlResponse {
        success: true,
        rows_affected: outcome.rows_affected,
        command: outcome.command.clone(),
        rows: outcome.rows,
        fields: outcome.fields,
    }))
}
