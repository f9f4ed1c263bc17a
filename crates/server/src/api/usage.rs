//! Synthetic usage statistics for the dashboard.
//!
//! The engines expose no per-database accounting here; figures are derived
//! deterministically from each registration's name so the dashboard has
//! stable numbers to render. Failures degrade to zeroed defaults.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ErrorBody;
use crate::registry;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseUsage {
    pub name: String,
    pub queries: u64,
    pub storage_mb: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub database_count: usize,
    pub total_queries: u64,
    pub total_storage_mb: u64,
    pub databases: Vec<DatabaseUsage>,
}

/// Stable pseudo-figures from the database name (FNV-1a fold).
fn synthetic_usage(name: &str) -> DatabaseUsage {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100_0000_01b3);
    }
    DatabaseUsage {
        name: name.to_string(),
        queries: 100 + h % 900,
        storage_mb: 5 + (h >> 32) % 250,
    }
}

/// Usage statistics across the caller's visible registrations.
#[utoipa::path(
    get,
    path = "/user/usage",
    tag = "Usage",
    responses(
        (status = 200, description = "Synthetic usage statistics", body = UsageResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn usage(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Json<UsageResponse> {
    let databases: Vec<DatabaseUsage> = registry::list_visible(&state.pool, &user)
        .await
        .iter()
        .map(|reg| synthetic_usage(&reg.name))
        .collect();

    Json(UsageResponse {
        database_count: databases.len(),
        total_queries: databases.iter().map(|d| d.queries).sum(),
        total_storage_mb: databases.iter().map(|d| d.storage_mb).sum(),
        databases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_usage_is_deterministic() {
        let a = synthetic_usage("shop_db");
        let b = synthetic_usage("shop_db");
        assert_eq!(a.queries, b.queries);
        assert_eq!(a.storage_mb, b.storage_mb);

        let c = synthetic_usage("other_db");
        assert!(a.queries != c.queries || a.storage_mb != c.storage_mb);
    }

    #[test]
    fn test_synthetic_usage_bounds() {
        for name in ["a", "shop_db", "really_long_database_name_00"] {
            let u = synthetic_usage(name);
            assert!((100..1000).contains(&u.queries));
            assert!((5..255).contains(&u.storage_mb));
        }
    }
}
