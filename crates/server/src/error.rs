//! API error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl maps
//! each variant to its HTTP status and a JSON body of the form
//! `{"error": "...", "error_code": "..."}` (the code only where a
//! discriminator exists, e.g. `DATABASE_EXISTS` on engine-level conflicts).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Conflict discriminator for a name that already exists on the engine
/// catalog even though the registry did not know about it.
pub const DATABASE_EXISTS: &str = "DATABASE_EXISTS";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input: bad database name, missing required field.
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid/expired token or bad credentials.
    #[error("{0}")]
    Auth(String),

    /// Caller lacks the role or ownership for the target resource.
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate email or duplicate database name, registry- or engine-level.
    #[error("{message}")]
    Conflict {
        message: String,
        error_code: Option<&'static str>,
    },

    /// Unknown registration id (or not visible to the caller).
    #[error("{0}")]
    NotFound(String),

    /// The backing engine rejected user SQL; message passed through verbatim.
    #[error("{0}")]
    Upstream(String),

    /// An engine-side operation (CREATE/DROP, direct SQL) failed; message
    /// passed through verbatim.
    #[error("{0}")]
    EngineFailed(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            error_code: None,
        }
    }

    pub fn database_exists(name: &str) -> Self {
        ApiError::Conflict {
            message: format!("database '{}' already exists", name),
            error_code: Some(DATABASE_EXISTS),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_REQUEST,
            ApiError::EngineFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(anyhow::Error::new(e).context("registry query failed"))
    }
}

/// Standardized error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = match &self {
            ApiError::Conflict { error_code, .. } => *error_code,
            _ => None,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::warn!("request failed: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
            error_code,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad name".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("no token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::conflict("dup").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Upstream("syntax error".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::EngineFailed("createdb failed".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_exists_carries_code() {
        let err = ApiError::database_exists("shop_db");
        match err {
            ApiError::Conflict { error_code, .. } => {
                assert_eq!(error_code, Some(DATABASE_EXISTS));
            }
            _ => panic!("expected conflict"),
        }
    }
}
