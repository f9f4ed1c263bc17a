//! Session tokens and password hashing.
//!
//! Tokens are HS256 JWTs embedding the user id, email, and role set, valid
//! for a configured number of hours (24 by default). `AuthUser` is the axum
//! extractor used by every protected handler: it validates the bearer token
//! and then re-resolves the user against the registry store, so deleted
//! users are rejected immediately even while their token is still valid.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use harbor_core::config::AuthConfig;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::{self, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    /// Expiry as unix seconds.
    pub exp: i64,
}

// ── Password hashing ──────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("password hashing failed")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

// ── Token issue / verify ──────────────────────────────────────────

pub fn issue_token(user: &User, cfg: &AuthConfig) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        roles: user.roles.clone(),
        exp: (Utc::now() + Duration::hours(cfg.token_ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("token signing failed")))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Auth("invalid or expired token".to_string()))
}

// ── Request extractor ─────────────────────────────────────────────

/// Authenticated caller, resolved freshly from the user table per request.
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts.headers.get("authorization")?.to_str().ok()?.trim();
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Auth("missing bearer token".to_string()))?;
        let claims = decode_token(token, &state.config.auth.jwt_secret)?;

        let user = users::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Auth("user no longer exists".to_string()))?;
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 24,
            admin_email: "admin@harbor.local".to_string(),
            admin_password: "admin".to_string(),
        }
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: String::new(),
            first_name: "A".to_string(),
            last_name: "X".to_string(),
            company_name: "".to_string(),
            roles: vec!["user".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let cfg = test_cfg();
        let user = test_user();
        let token = issue_token(&user, &cfg).unwrap();
        let claims = decode_token(&token, &cfg.jwt_secret).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.roles, vec!["user"]);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let cfg = test_cfg();
        let user = test_user();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(&token, &cfg.jwt_secret).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let cfg = test_cfg();
        let token = issue_token(&test_user(), &cfg).unwrap();
        assert!(decode_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_password_verify() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
    }
}
