//! Registration, login, and token verification endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{self, AuthUser};
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;
use crate::users::{self, NewUser, User, ROLE_USER};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Authenticate with email and password, returning a 24-hour session token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token and user", body = AuthResponse),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = users::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(|| ApiError::Auth("invalid email or password".to_string()))?;

    if !auth::verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Auth("invalid email or password".to_string()));
    }

    let token = auth::issue_token(&user, &state.config.auth)?;
    Ok(Json(AuthResponse { token, user }))
}

/// Create a new account with the default `user` role.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing field", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let user = users::create_user(
        &state.pool,
        &NewUser {
            email: req.email,
            password_hash: auth::hash_password(&req.password)?,
            first_name: req.first_name,
            last_name: req.last_name,
            company_name: req.company_name,
            roles: vec![ROLE_USER.to_string()],
        },
    )
    .await?;

    let token = auth::issue_token(&user, &state.config.auth)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Check that the presented bearer token is valid and its user still exists.
#[utoipa::path(
    get,
    path = "/auth/verify-token",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn verify_token(AuthUser(_user): AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "valid": true }))
}

/// The authenticated caller's account (password hash excluded).
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
