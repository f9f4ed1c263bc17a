//! Domain-focused API endpoint modules.
//!
//! Each sub-module owns a single responsibility area; the OpenAPI aggregator
//! lives in doc.rs.

pub mod auth;
pub mod databases;
pub mod doc;
pub mod health;
pub mod query;
pub mod usage;

// ── Re-exports ───────────────────────────────────────────────────
// Preserves flat `api::foo` import paths used by router.rs registration.

pub use auth::{login, me, register, verify_token};
pub use databases::{
    databases_connection, databases_create, databases_delete, databases_list, sync_databases,
};
pub use health::health;
pub use query::{direct_sql, execute_sql};
pub use usage::usage;
