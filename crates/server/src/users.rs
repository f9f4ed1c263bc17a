//! User table access: the account half of the credential store.
//!
//! Every lookup runs against the registry pool; there is no user cache, so a
//! deleted account loses access on its next request even with a valid token.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use harbor_core::config::AuthConfig;

use crate::auth;
use crate::error::ApiError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }
}

pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub roles: Vec<String>,
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, \
                            company_name, roles, created_at, updated_at";

/// True for Postgres unique-constraint violations (SQLSTATE 23505). The
/// constraint is the authoritative duplicate signal for concurrent inserts.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

pub async fn create_user(pool: &PgPool, new: &NewUser) -> Result<User, ApiError> {
    let result = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, company_name, roles) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.company_name)
    .bind(&new.roles)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict(format!(
            "email '{}' is already registered",
            new.email
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Insert the default administrative user when the user table is empty.
pub async fn seed_admin(pool: &PgPool, cfg: &AuthConfig) -> Result<(), ApiError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let admin = create_user(
        pool,
        &NewUser {
            email: cfg.admin_email.clone(),
            password_hash: auth::hash_password(&cfg.admin_password)?,
            first_name: "Admin".to_string(),
            last_name: "".to_string(),
            company_name: "".to_string(),
            roles: vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()],
        },
    )
    .await?;
    info!("Seeded default admin user '{}'", admin.email);
    Ok(())
}

/// Resolve the owner to which reconciled registrations are attributed:
/// the configured admin account, falling back to the oldest user on record.
pub async fn default_admin_id(pool: &PgPool, cfg: &AuthConfig) -> Result<Uuid, ApiError> {
    if let Some(admin) = find_by_email(pool, &cfg.admin_email).await? {
        return Ok(admin.id);
    }
    let oldest: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM users ORDER BY created_at LIMIT 1")
            .fetch_optional(pool)
            .await?;
    oldest.ok_or_else(|| {
        ApiError::Internal(anyhow::anyhow!("no users exist to own reconciled databases"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_roles(roles: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            company_name: "".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(user_with_roles(&["user", "admin"]).is_admin());
        assert!(!user_with_roles(&["user", "developer"]).is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = user_with_roles(&["user"]);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@x.com");
    }
}
