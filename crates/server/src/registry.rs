//! Database registration store and catalog reconciliation.
//!
//! The registry is the authoritative mapping of logical database name to
//! owning user and connection coordinates. It is best-effort consistent with
//! the engine catalogs: provisioning keeps the two aligned per operation,
//! and `reconcile` backfills registrations for databases that exist on an
//! engine without a registry row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{EngineConnector, Origin};
use crate::error::ApiError;
use crate::users::{is_unique_violation, User};

#[derive(Debug, Clone, Serialize, FromRow, utoipa::ToSchema)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
    pub origin: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewRegistration {
    pub user_id: Uuid,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    pub password: String,
    pub origin: Origin,
}

const REG_COLUMNS: &str =
    "id, user_id, name, host, port, username, password, origin, created_at, updated_at";

// ── CRUD ──────────────────────────────────────────────────────────

pub async fn insert(pool: &PgPool, new: &NewRegistration) -> Result<Registration, ApiError> {
    let result = sqlx::query_as::<_, Registration>(&format!(
        "INSERT INTO databases (id, user_id, name, host, port, username, password, origin) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {REG_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(&new.name)
    .bind(&new.host)
    .bind(new.port)
    .bind(&new.username)
    .bind(&new.password)
    .bind(new.origin.as_str())
    .fetch_one(pool)
    .await;

    match result {
        Ok(reg) => Ok(reg),
        // The unique constraint on name is the authoritative conflict signal
        // when two creates race past the existence checks.
        Err(e) if is_unique_violation(&e) => Err(ApiError::database_exists(&new.name)),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Registration>, ApiError> {
    let reg = sqlx::query_as::<_, Registration>(&format!(
        "SELECT {REG_COLUMNS} FROM databases WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(reg)
}

/// Resolve a registration by id, scoped to the caller unless they hold the
/// admin role.
pub async fn find_visible(
    pool: &PgPool,
    user: &User,
    id: Uuid,
) -> Result<Option<Registration>, ApiError> {
    let reg = if user.is_admin() {
        sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REG_COLUMNS} FROM databases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
    } else {
        sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REG_COLUMNS} FROM databases WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user.id)
        .fetch_optional(pool)
        .await?
    };
    Ok(reg)
}

/// Registration by name, scoped the same way as `find_visible`.
pub async fn find_visible_by_name(
    pool: &PgPool,
    user: &User,
    name: &str,
) -> Result<Option<Registration>, ApiError> {
    let reg = find_by_name(pool, name).await?;
    Ok(reg.filter(|r| user.is_admin() || r.user_id == user.id))
}

/// All registrations visible to the caller. Lookup failures degrade to an
/// empty list so the dashboard read path never blocks on registry trouble.
pub async fn list_visible(pool: &PgPool, user: &User) -> Vec<Registration> {
    let result = if user.is_admin() {
        sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REG_COLUMNS} FROM databases ORDER BY created_at"
        ))
        .fetch_all(pool)
        .await
    } else {
        sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REG_COLUMNS} FROM databases WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user.id)
        .fetch_all(pool)
        .await
    };

    match result {
        Ok(regs) => regs,
        Err(e) => {
            warn!("Failed to list registrations for '{}': {}", user.email, e);
            Vec::new()
        }
    }
}

pub async fn delete_by_id(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM databases WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Reconciliation ────────────────────────────────────────────────

pub struct ReconcileOutcome {
    /// Every non-template database found on the engine.
    pub scanned: Vec<String>,
    /// Names newly registered during this run.
    pub inserted: Vec<String>,
}

/// Catalog names with no registration at the same (name, port). Pure diff so
/// the idempotence law is testable without an engine.
fn missing_registrations(
    catalog: &[String],
    existing: &[(String, i32)],
    port: i32,
) -> Vec<String> {
    catalog
        .iter()
        .filter(|name| {
            !existing
                .iter()
                .any(|(n, p)| n == name.as_str() && *p == port)
        })
        .cloned()
        .collect()
}

/// Align the registry with one engine's live catalog: every database present
/// on the engine but unknown to the registry is registered to the default
/// administrative owner with this engine's coordinates. Idempotent, keyed on
/// (name, port).
pub async fn reconcile(
    pool: &PgPool,
    connector: &EngineConnector,
    origin: Origin,
    admin_user_id: Uuid,
) -> Result<ReconcileOutcome, ApiError> {
    let catalog = connector.list_databases().await?;
    let existing: Vec<(String, i32)> =
        sqlx::query_as("SELECT name, port FROM databases")
            .fetch_all(pool)
            .await?;

    let cfg = connector.config();
    let port = cfg.port as i32;
    let mut inserted = Vec::new();

    for name in missing_registrations(&catalog, &existing, port) {
        match insert(
            pool,
            &NewRegistration {
                user_id: admin_user_id,
                name: name.clone(),
                host: cfg.host.clone(),
                port,
                username: cfg.username.clone(),
                password: cfg.password.clone(),
                origin,
            },
        )
        .await
        {
            Ok(_) => inserted.push(name),
            // A concurrent create or reconcile got there first.
            Err(ApiError::Conflict { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    if !inserted.is_empty() {
        info!(
            "Reconciled {} engine: registered {} unmanaged database(s)",
            origin.as_str(),
            inserted.len()
        );
    }

    Ok(ReconcileOutcome {
        scanned: catalog,
        inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_registrations_diff() {
        let catalog = names(&["postgres", "shop_db", "analytics"]);
        let existing = vec![("shop_db".to_string(), 5432)];
        let missing = missing_registrations(&catalog, &existing, 5432);
        assert_eq!(missing, names(&["postgres", "analytics"]));
    }

    #[test]
    fn test_missing_registrations_keyed_on_port() {
        // Same name on a different port is a different database.
        let catalog = names(&["shop_db"]);
        let existing = vec![("shop_db".to_string(), 5433)];
        assert_eq!(
            missing_registrations(&catalog, &existing, 5432),
            names(&["shop_db"])
        );
    }

    #[test]
    fn test_missing_registrations_idempotent() {
        let catalog = names(&["a", "b"]);
        let mut existing: Vec<(String, i32)> = Vec::new();

        let first = missing_registrations(&catalog, &existing, 5432);
        assert_eq!(first.len(), 2);
        for name in &first {
            existing.push((name.clone(), 5432));
        }

        // Second run against the unchanged catalog inserts nothing.
        assert!(missing_registrations(&catalog, &existing, 5432).is_empty());
    }
}
