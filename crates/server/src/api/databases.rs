//! Database registration endpoints: list, provision, deprovision,
//! connection info, and on-demand reconciliation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::engine::Origin;
use crate::error::{ApiError, ErrorBody};
use crate::provisioning::{self, ConnectionInfo};
use crate::registry::{self, Registration};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDatabaseRequest {
    pub name: String,
    /// Target engine cluster; defaults to the local engine.
    #[serde(default)]
    pub origin: Option<Origin>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub success: bool,
    pub count: usize,
    pub databases: Vec<String>,
}

/// List registrations visible to the caller (all of them for admins).
/// Registry trouble degrades to an empty list rather than an error.
#[utoipa::path(
    get,
    path = "/databases",
    tag = "Databases",
    responses(
        (status = 200, description = "Visible registrations", body = Vec<Registration>),
        (status = 401, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn databases_list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Json<Vec<Registration>> {
    Json(registry::list_visible(&state.pool, &user).await)
}

/// Provision a new database on a backing engine and register it.
#[utoipa::path(
    post,
    path = "/databases",
    tag = "Databases",
    request_body = CreateDatabaseRequest,
    responses(
        (status = 201, description = "Database created and registered", body = Registration),
        (status = 400, description = "Invalid database name", body = ErrorBody),
        (status = 409, description = "Name already registered or present on the engine", body = ErrorBody),
        (status = 500, description = "Engine-side create failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn databases_create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateDatabaseRequest>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let origin = req.origin.unwrap_or(Origin::Local);
    let reg =
        provisioning::create_database(&state.pool, &state.engines, &user, &req.name, origin)
            .await?;
    Ok((StatusCode::CREATED, Json(reg)))
}

/// Deprovision a database: best-effort engine-side drop, unconditional
/// registry removal.
#[utoipa::path(
    delete,
    path = "/databases/{id}",
    tag = "Databases",
    params(("id" = Uuid, Path, description = "Registration id")),
    responses(
        (status = 200, description = "Registration removed", body = MessageResponse),
        (status = 404, description = "Unknown or not visible", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn databases_delete(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = provisioning::delete_database(&state.pool, &state.engines, &user, id).await?;
    Ok(Json(MessageResponse { message }))
}

/// Connection coordinates and connection string for a visible registration.
#[utoipa::path(
    get,
    path = "/databases/{id}/connection",
    tag = "Databases",
    params(("id" = Uuid, Path, description = "Registration id")),
    responses(
        (status = 200, description = "Connection details", body = ConnectionInfo),
        (status = 404, description = "Unknown or not visible", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn databases_connection(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionInfo>, ApiError> {
    let info = provisioning::get_connection(&state.pool, &user, id).await?;
    Ok(Json(info))
}

/// Reconcile the registry against the local engine's live catalog,
/// registering unmanaged databases to the administrative owner. Open
/// endpoint: reconciliation is advisory and idempotent.
#[utoipa::path(
    get,
    path = "/sync-databases",
    tag = "Databases",
    responses(
        (status = 200, description = "Catalog scanned", body = SyncResponse),
        (status = 500, description = "Engine unreachable", body = ErrorBody)
    )
)]
pub async fn sync_databases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncResponse>, ApiError> {
    let outcome = registry::reconcile(
        &state.pool,
        &state.engines.local,
        Origin::Local,
        state.admin_user_id,
    )
    .await?;
    Ok(Json(SyncResponse {
        success: true,
        count: outcome.scanned.len(),
        databases: outcome.scanned,
    }))
}
